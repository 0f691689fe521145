//! Human-facing rendering of a terminal outcome

use solana_sdk::signature::Signature;

use crate::types::Outcome;

#[derive(Debug, Clone)]
pub struct OutcomeReporter {
    network: String,
}

impl OutcomeReporter {
    /// `network` fills `https://explorer.<network>/tx/<signature>`
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
        }
    }

    pub fn explorer_url(&self, signature: &Signature) -> String {
        format!("https://explorer.{}/tx/{}", self.network, signature)
    }

    /// Lines to show the user, in order
    pub fn render(&self, outcome: &Outcome) -> Vec<String> {
        match outcome {
            Outcome::Confirmed { signature, .. } => vec![
                "Transaction successful".to_string(),
                format!("Signature: {}", signature),
                format!("Explorer URL: {}", self.explorer_url(signature)),
            ],
            // Landed, so there is something to look at
            Outcome::ExecutionFailed { signature, .. } => vec![
                format!("Transaction failed: {}", outcome),
                format!("Explorer URL: {}", self.explorer_url(signature)),
            ],
            _ => {
                let mut lines = vec![format!("Transaction failed: {}", outcome)];
                if let Some(signature) = outcome.signature() {
                    lines.push(format!("Signature: {}", signature));
                }
                lines
            }
        }
    }

    /// Log the rendering: info on success, error otherwise
    pub fn report(&self, outcome: &Outcome) {
        for line in self.render(outcome) {
            if outcome.is_confirmed() {
                tracing::info!("{}", line);
            } else {
                tracing::error!("{}", line);
            }
        }
    }
}

impl Default for OutcomeReporter {
    fn default() -> Self {
        Self::new("solana.com")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_confirmed_includes_explorer_link() {
        let signature = Signature::from([7u8; 64]);
        let reporter = OutcomeReporter::default();
        let lines = reporter.render(&Outcome::Confirmed { signature, slot: 9 });

        assert_eq!(lines[0], "Transaction successful");
        assert_eq!(
            lines[2],
            format!("Explorer URL: https://explorer.solana.com/tx/{}", signature)
        );
    }

    #[test]
    fn test_simulation_failure_has_no_signature_line() {
        let reporter = OutcomeReporter::default();
        let lines = reporter.render(&Outcome::SimulationFailed {
            reason: "InstructionError(2, Custom(1))".to_string(),
        });

        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("InstructionError"));
    }

    #[test]
    fn test_unknown_mentions_it_may_still_land() {
        let signature = Signature::from([3u8; 64]);
        let reporter = OutcomeReporter::default();
        let lines = reporter.render(&Outcome::Unknown {
            signature,
            reason: "connection reset".to_string(),
        });

        assert!(lines[0].contains("may still land"));
        assert_eq!(lines[1], format!("Signature: {}", signature));
    }

    proptest! {
        #[test]
        fn explorer_url_ends_with_signature(bytes in prop::array::uniform32(any::<u8>()), network in "[a-z]{1,12}\\.[a-z]{2,4}") {
            let mut raw = [0u8; 64];
            raw[..32].copy_from_slice(&bytes);
            raw[32..].copy_from_slice(&bytes);
            let signature = Signature::from(raw);

            let url = OutcomeReporter::new(network.clone()).explorer_url(&signature);
            let expected_prefix = format!("https://explorer.{}/tx/", network);
            prop_assert!(url.starts_with(&expected_prefix));
            prop_assert!(url.ends_with(&signature.to_string()));
        }
    }
}
