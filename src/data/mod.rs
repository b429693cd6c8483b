//! Data structures for resistome abundance analysis.

mod abundance;
pub mod annotation;
mod metadata;
mod stratified;

pub use abundance::{AbundanceMatrix, FEATURE_ID_HEADER};
pub use annotation::AnnotationTable;
pub use metadata::{Metadata, Variable, VariableType, SAMPLE_ID_COLUMN};
pub use stratified::{
    write_taxon_contributions, StratifiedRow, StratifiedTable, TaxonContribution, FEATURE_COLUMN, TAXON_COLUMN,
};
