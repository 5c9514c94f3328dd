use dioxus::prelude::*;

use crate::config::TOKEN_DECIMALS;
use crate::state::ViewState;
use crate::units;
use crate::SharedOrchestrator;

#[component]
pub fn WithdrawPanel() -> Element {
    let view = use_context::<Signal<ViewState>>();
    let orch = use_context::<SharedOrchestrator>();

    let vs = view.read().clone();
    let staked = units::format_token_amount(vs.stake_amount, TOKEN_DECIMALS);
    let unlocks = units::format_timestamp(vs.stake_unlock_time);

    let on_withdraw = move |_| {
        let orch = orch.clone();
        spawn(async move {
            orch.withdraw().await;
        });
    };

    rsx! {
        div { class: "panel",
            h2 { "Withdraw" }
            if vs.stake_active {
                p { class: "panel-desc", "Staked: {staked} cHOM, unlocks {unlocks}." }
            } else {
                p { class: "panel-desc", "No active stake." }
            }
            button {
                class: "btn btn-primary",
                disabled: vs.withdrawing || !vs.withdrawable,
                onclick: on_withdraw,
                if vs.withdrawing { "Withdrawing..." } else { "Withdraw" }
            }
            if vs.stake_active && !vs.withdrawable {
                p { class: "hint", "Still locked. Withdrawal opens at the unlock time." }
            }
        }
    }
}
