use dioxus::prelude::*;

use crate::state::ViewState;
use crate::SharedOrchestrator;

#[component]
pub fn StakePanel() -> Element {
    let view = use_context::<Signal<ViewState>>();
    let orch = use_context::<SharedOrchestrator>();

    let mut amount = use_signal(String::new);
    let mut hours = use_signal(|| "24".to_string());
    let vs = view.read().clone();

    let not_operator = vs.is_operator != Some(true);

    let on_stake = move |_| {
        let orch = orch.clone();
        let amount_input = amount.read().clone();
        let hours_input = hours.read().clone();
        spawn(async move {
            orch.stake(&amount_input, &hours_input).await;
        });
    };

    rsx! {
        div { class: "panel",
            h2 { "Stake" }
            p { class: "panel-desc",
                "The amount is encrypted client-side before it touches the chain."
            }
            div { class: "form-group",
                label { "Amount (cHOM)" }
                input {
                    class: "input",
                    r#type: "text",
                    placeholder: "250.0",
                    value: "{amount}",
                    oninput: move |e| amount.set(e.value()),
                }
            }
            div { class: "form-group",
                label { "Lock duration (hours)" }
                input {
                    class: "input",
                    r#type: "text",
                    value: "{hours}",
                    oninput: move |e| hours.set(e.value()),
                }
            }
            button {
                class: "btn btn-primary",
                disabled: vs.staking || vs.stake_active || not_operator,
                onclick: on_stake,
                if vs.staking { "Staking..." } else { "Stake" }
            }
            if vs.stake_active {
                p { class: "hint", "A stake is already active. Withdraw it before staking again." }
            } else if not_operator {
                p { class: "hint", "Authorize the vault first." }
            }
        }
    }
}
