#![allow(non_snake_case)]

use dioxus::prelude::*;

use homora_vault_ui::components::{
    authorize::AuthorizePanel, claim::ClaimPanel, header::Header, overview::Overview,
    stake::StakePanel, withdraw::WithdrawPanel,
};
use homora_vault_ui::eth::SharedEthClient;
use homora_vault_ui::state::{ViewState, WalletStatus};
use homora_vault_ui::{build_eth_client, build_orchestrator, SharedOrchestrator};

const STYLE: &str = include_str!("../assets/style.css");

fn main() {
    env_logger::init();
    dioxus::launch(App);
}

#[component]
fn App() -> Element {
    let eth = build_eth_client();
    let _eth = use_context_provider::<SharedEthClient>({
        let eth = eth.clone();
        move || eth
    });
    let orch = use_context_provider::<SharedOrchestrator>(move || {
        std::sync::Arc::new(build_orchestrator(eth))
    });
    let mut view = use_context_provider(|| Signal::new(ViewState::default()));
    let status = use_context_provider(|| Signal::new(WalletStatus::Disconnected));
    let connected = status.read().account().is_some();

    // Forward orchestrator snapshots into the render signal. Whole values
    // only; the channel never exposes a half-built view.
    use_future(move || {
        let orch = orch.clone();
        async move {
            let mut rx = orch.subscribe();
            loop {
                if rx.changed().await.is_err() {
                    break;
                }
                let next = rx.borrow_and_update().clone();
                view.set(next);
            }
        }
    });

    rsx! {
        document::Style { {STYLE} }
        div { class: "app-container",
            Header {}
            main { class: "main-content",
                Overview {}
                if connected {
                    div { class: "panel-grid",
                        ClaimPanel {}
                        AuthorizePanel {}
                        StakePanel {}
                        WithdrawPanel {}
                    }
                }
            }
        }
    }
}
