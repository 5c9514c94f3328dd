use dioxus::prelude::*;

use crate::state::ViewState;
use crate::SharedOrchestrator;

#[component]
pub fn ClaimPanel() -> Element {
    let view = use_context::<Signal<ViewState>>();
    let orch = use_context::<SharedOrchestrator>();

    let vs = view.read().clone();
    let already_claimed = vs.has_claimed == Some(true);

    let on_claim = move |_| {
        let orch = orch.clone();
        spawn(async move {
            orch.claim().await;
        });
    };

    rsx! {
        div { class: "panel",
            h2 { "Claim tokens" }
            p { class: "panel-desc", "One-time faucet claim of 1000 cHOM per account." }
            button {
                class: "btn btn-primary",
                disabled: vs.claiming || vs.refreshing || already_claimed,
                onclick: on_claim,
                if vs.claiming {
                    "Claiming..."
                } else if already_claimed {
                    "Already claimed"
                } else {
                    "Claim 1000 cHOM"
                }
            }
        }
    }
}
