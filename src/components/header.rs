use dioxus::prelude::*;

use crate::eth::SharedEthClient;
use crate::state::WalletStatus;
use crate::SharedOrchestrator;

#[component]
pub fn Header() -> Element {
    let mut status = use_context::<Signal<WalletStatus>>();
    let eth = use_context::<SharedEthClient>();
    let orch = use_context::<SharedOrchestrator>();

    let current = status.read().clone();
    let connecting = matches!(current, WalletStatus::Connecting);

    let on_connect = move |_| {
        let eth = eth.clone();
        let orch = orch.clone();
        status.set(WalletStatus::Connecting);
        spawn(async move {
            let result = tokio::task::spawn_blocking(move || eth.accounts())
                .await
                .unwrap();
            match result {
                Ok(accounts) => match accounts.first() {
                    Some(account) => {
                        let account = *account;
                        status.set(WalletStatus::Connected(account));
                        orch.set_account(Some(account)).await;
                    }
                    None => {
                        status.set(WalletStatus::Error(
                            "No accounts exposed by the wallet".into(),
                        ));
                    }
                },
                Err(e) => status.set(WalletStatus::Error(e.to_string())),
            }
        });
    };

    let orch_for_disconnect = use_context::<SharedOrchestrator>();
    let on_disconnect = move |_| {
        let orch = orch_for_disconnect.clone();
        status.set(WalletStatus::Disconnected);
        spawn(async move {
            orch.set_account(None).await;
        });
    };

    rsx! {
        header { class: "topbar",
            div { class: "topbar-left",
                span { class: "brand-icon", "◆" }
                span { class: "brand-text", "Homora Vault" }
                span { class: "brand-tag", "Sepolia" }
            }
            div { class: "topbar-right",
                match &current {
                    WalletStatus::Connected(account) => rsx! {
                        span { class: "wallet-address mono", "{truncate_address(&account.to_string())}" }
                        button { class: "btn btn-ghost", onclick: on_disconnect, "Disconnect" }
                    },
                    WalletStatus::Error(msg) => rsx! {
                        span { class: "error-text", "{msg}" }
                        button { class: "btn btn-primary", onclick: on_connect, "Retry" }
                    },
                    _ => rsx! {
                        button {
                            class: "btn btn-primary",
                            disabled: connecting,
                            onclick: on_connect,
                            if connecting { "Connecting..." } else { "Connect Wallet" }
                        }
                    },
                }
            }
        }
    }
}

fn truncate_address(address: &str) -> String {
    if address.len() > 12 {
        format!("{}...{}", &address[..6], &address[address.len() - 4..])
    } else {
        address.to_string()
    }
}
