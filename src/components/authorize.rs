use dioxus::prelude::*;

use crate::state::ViewState;
use crate::SharedOrchestrator;

#[component]
pub fn AuthorizePanel() -> Element {
    let view = use_context::<Signal<ViewState>>();
    let orch = use_context::<SharedOrchestrator>();

    let mut days = use_signal(|| "365".to_string());
    let vs = view.read().clone();

    let on_authorize = move |_| {
        let orch = orch.clone();
        let days_input = days.read().clone();
        spawn(async move {
            orch.authorize_operator(&days_input).await;
        });
    };

    rsx! {
        div { class: "panel",
            h2 { "Authorize vault" }
            p { class: "panel-desc",
                "Let the vault move your encrypted tokens when you stake. Required once before staking."
            }
            div { class: "form-group",
                label { "Operator window (days)" }
                input {
                    class: "input",
                    r#type: "text",
                    value: "{days}",
                    oninput: move |e| days.set(e.value()),
                }
            }
            button {
                class: "btn btn-primary",
                disabled: vs.approving,
                onclick: on_authorize,
                if vs.approving { "Authorizing..." } else { "Authorize" }
            }
            if vs.is_operator == Some(true) {
                p { class: "success-text", "Vault is currently authorized." }
            }
        }
    }
}
