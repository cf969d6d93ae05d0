//! Container configuration

use serde::{Deserialize, Serialize};

/// Default limit on nested constructor calls.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 100;

/// Settings shared by a root scope and every scope created under it.
///
/// All fields have defaults, so a partial document deserializes:
///
/// ```
/// use weft_di::ContainerConfig;
///
/// let config: ContainerConfig = serde_json::from_str(r#"{ "dry_run": true }"#).unwrap();
/// assert!(config.dry_run);
/// assert!(!config.defer_acyclic_verification);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
	/// Check for cycles on the first `invoke` instead of on every `provide`
	pub defer_acyclic_verification: bool,
	/// Resolve without calling user functions, committing placeholders
	pub dry_run: bool,
	/// Deepest chain of nested constructor calls before giving up
	pub max_resolution_depth: usize,
	/// Seed for the value group shuffle; random when absent
	pub seed: Option<u64>,
}

impl Default for ContainerConfig {
	fn default() -> Self {
		Self {
			defer_acyclic_verification: false,
			dry_run: false,
			max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
			seed: None,
		}
	}
}
