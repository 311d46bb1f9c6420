//! Hierarchical stream-reach labeling for NHDPlus hydrography networks.
//!
//! Given a read-only [`FlowlineStore`] and a HUC8 watershed code, [`traversal::label_watershed`]
//! walks upstream from the watershed's outlets and assigns every reach a
//! compact, hierarchical label that encodes its main stem, tributary
//! branch, and nested tributary position.

pub mod compactor;
pub mod digits;
pub mod error;
pub mod flowline;
pub mod ids;
pub mod minter;
pub mod outlet;
pub mod traversal;

pub use compactor::{compact_label, fully_qualify, MAX_FQ_LABEL_LEN, MAX_LABEL_LEN, MAX_LABEL_LEVEL};
pub use digits::DigitBase;
pub use error::{CompactError, MinterError, StreamNetError};
pub use flowline::{Flowline, FlowlineStore, LabeledFlowline, WatershedLabeling, WatershedStats};
pub use ids::{ComId, NhdPlusId};
pub use minter::LabelMinter;
pub use outlet::find_roots;
pub use traversal::label_watershed;
