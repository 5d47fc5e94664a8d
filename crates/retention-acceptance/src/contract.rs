//! Interface of the module under test
//!
//! Names of the input variables, outputs and reserved identifiers the storage
//! module has to honour. They are fixed by the module, not by the harness.

/// Input variable carrying the unique environment name
pub const TEST_NAME_VAR: &str = "test_name";

/// Input variable carrying the retention label
pub const DATA_EXPIRY_VAR: &str = "data_expiry";

/// Output identifying the provisioned bucket
pub const BUCKET_NAME_OUTPUT: &str = "bucket_name";

/// Identifier of the lifecycle rule that carries the expiration
pub const EXPIRY_RULE_ID: &str = "Expiration days";

/// Tag key recording the retention label on the bucket
pub const EXPIRY_TAG_KEY: &str = "data_expiry";
