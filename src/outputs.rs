//! Stack output extraction
//!
//! Outputs are fetched fresh per phase; nothing is cached. The required-key
//! set is the caller's choice - failing fast here prevents a later phase from
//! persisting an empty distribution id.

use crate::error::{HoistError, HoistResult};
use crate::provider::StackProvider;
use crate::stack::StackOutputs;

/// Fetch a stack's outputs, verifying every key in `required` is present.
///
/// Fails with [`HoistError::MissingOutput`] naming the first absent key.
pub fn extract_outputs(
    provider: &dyn StackProvider,
    stack_name: &str,
    required: &[&str],
) -> HoistResult<StackOutputs> {
    let values = provider
        .stack_outputs(stack_name)
        .map_err(|e| HoistError::Api {
            message: format!("describing stack '{stack_name}': {e}"),
        })?;

    let outputs = StackOutputs::new(stack_name, values);
    for key in required {
        outputs.require(key)?;
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{ProviderError, StackState};
    use crate::stack::{keys, StackDefinition};
    use std::collections::BTreeMap;

    struct FixedOutputs(BTreeMap<String, String>);

    impl StackProvider for FixedOutputs {
        fn create_stack(&self, _d: &StackDefinition) -> Result<(), ProviderError> {
            unimplemented!()
        }
        fn update_stack(&self, _d: &StackDefinition) -> Result<(), ProviderError> {
            unimplemented!()
        }
        fn stack_state(&self, _name: &str) -> Result<StackState, ProviderError> {
            Ok(StackState::Settled)
        }
        fn stack_outputs(&self, _name: &str) -> Result<BTreeMap<String, String>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    fn provider(pairs: &[(&str, &str)]) -> FixedOutputs {
        FixedOutputs(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_all_required_present() {
        let p = provider(&[
            (keys::DISTRIBUTION_ID, "E123"),
            (keys::DISTRIBUTION_DOMAIN, "d111.cloudfront.net"),
        ]);
        let outputs = extract_outputs(
            &p,
            "site",
            &[keys::DISTRIBUTION_ID, keys::DISTRIBUTION_DOMAIN],
        )
        .unwrap();
        assert_eq!(outputs.get(keys::DISTRIBUTION_ID), Some("E123"));
        assert_eq!(
            outputs.get(keys::DISTRIBUTION_DOMAIN),
            Some("d111.cloudfront.net")
        );
    }

    #[test]
    fn test_missing_required_key_is_named() {
        let p = provider(&[(keys::DISTRIBUTION_ID, "E123")]);
        let err = extract_outputs(
            &p,
            "site",
            &[keys::DISTRIBUTION_ID, keys::DISTRIBUTION_DOMAIN],
        )
        .unwrap_err();
        match err {
            HoistError::MissingOutput { key, .. } => {
                assert_eq!(key, keys::DISTRIBUTION_DOMAIN);
            }
            other => panic!("expected MissingOutput, got {other:?}"),
        }
    }

    #[test]
    fn test_optional_keys_do_not_fail() {
        let p = provider(&[
            (keys::DISTRIBUTION_ID, "E123"),
            (keys::DISTRIBUTION_DOMAIN, "d111.cloudfront.net"),
        ]);
        let outputs = extract_outputs(&p, "site", &[keys::DISTRIBUTION_ID]).unwrap();
        assert_eq!(outputs.get(keys::HOSTED_ZONE_ID), None);
    }
}
