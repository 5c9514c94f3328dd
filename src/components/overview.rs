use dioxus::prelude::*;

use crate::config::TOKEN_DECIMALS;
use crate::state::{ViewState, WalletStatus};
use crate::units;
use crate::SharedOrchestrator;

/// Balance cards plus the shared status line. Encrypted values render as
/// `--` until a decryption grant lands.
#[component]
pub fn Overview() -> Element {
    let view = use_context::<Signal<ViewState>>();
    let status = use_context::<Signal<WalletStatus>>();
    let orch = use_context::<SharedOrchestrator>();

    let vs = view.read().clone();
    let connected = status.read().account().is_some();

    let on_refresh = move |_| {
        let orch = orch.clone();
        spawn(async move {
            orch.refresh().await;
        });
    };

    rsx! {
        section { class: "overview",
            div { class: "overview-head",
                div {
                    h1 { "Confidential Staking" }
                    p { class: "subtitle",
                        "Balances stay encrypted on-chain. Only you can decrypt them."
                    }
                }
                button {
                    class: "btn btn-ghost",
                    disabled: !connected || vs.refreshing,
                    onclick: on_refresh,
                    if vs.refreshing { "Refreshing..." } else { "Refresh" }
                }
            }

            if !connected {
                p { class: "hint", "Connect your wallet to load vault state." }
            } else {
                div { class: "card-grid",
                    StatCard {
                        label: "Wallet balance",
                        value: units::format_token_amount(vs.balance, TOKEN_DECIMALS),
                        unit: "cHOM",
                    }
                    StatCard {
                        label: "Staked amount",
                        value: units::format_token_amount(vs.stake_amount, TOKEN_DECIMALS),
                        unit: "cHOM",
                    }
                    StatCard {
                        label: "Unlock time",
                        value: units::format_timestamp(vs.stake_active.then_some(vs.stake_unlock_time).flatten()),
                        unit: "",
                    }
                    StatCard {
                        label: "Vault authorized",
                        value: flag_text(vs.is_operator),
                        unit: "",
                    }
                }
            }

            if let Some(msg) = &vs.status {
                p { class: "status-line", "{msg}" }
            }
        }
    }
}

#[component]
fn StatCard(label: &'static str, value: String, unit: &'static str) -> Element {
    rsx! {
        div { class: "card",
            span { class: "card-label", "{label}" }
            span { class: "card-value",
                "{value}"
                if !unit.is_empty() {
                    span { class: "card-unit", " {unit}" }
                }
            }
        }
    }
}

fn flag_text(flag: Option<bool>) -> String {
    match flag {
        Some(true) => "Yes".to_string(),
        Some(false) => "No".to_string(),
        None => "--".to_string(),
    }
}
