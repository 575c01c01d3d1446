//! Training-time preprocessing stages.
//!
//! - row cleaning (`clean`)
//! - categorical expansion and the frozen schema (`encode`, `schema`)
//! - seeded train/test split (`split`)
//! - minority oversampling (`balance`)
//! - standardization (`scale`)

pub mod balance;
pub mod clean;
pub mod encode;
pub mod scale;
pub mod schema;
pub mod split;

pub use balance::{BalanceConfig, BalanceReport, balance};
pub use clean::{CleanedRecords, drop_negative_monetary};
pub use encode::{CategoricalEncoder, EncodedData};
pub use scale::StandardScaler;
pub use schema::{CategoricalLevels, FeatureSchema};
pub use split::{SplitReport, TrainTestSplit, train_test_split};
