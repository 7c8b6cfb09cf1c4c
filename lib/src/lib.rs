//! Derive a breast cancer GWAS cohort, and its subtype-specific phenotype files, from a
//! prospective cohort extract and a pathology extract.
//!
//! The stages are
//!
//!  1. [`sites::classify`]: one indicator column per cancer site,
//!  2. [`outcome::define`]: `breast_cancer_prevalent` and `breast_cancer`,
//!  3. [`exclusion::exclude_prevalent`] then [`exclusion::exclude_incident`]: drop participants
//!     whose other cancers would confound the outcome,
//!  4. [`subtypes::classify`]: receptor status to subtype calls,
//!  5. [`reconcile::attach_subtypes`] then [`reconcile::split`]: one phenotype file per subtype.
//!
//! [`pipeline`] runs them against files on disk.
pub mod config;
pub mod error;
pub mod exclusion;
pub mod outcome;
pub mod partition;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod sites;
pub mod subtypes;
pub mod table;
pub mod tri;
mod util;

pub use anyhow::{Context, Error};
use std::sync::Arc;

pub use crate::{
    config::{Config, VocabularyPolicy},
    error::CohortError,
    partition::{DropReason, Partition},
    report::Report,
    sites::CancerSite,
    subtypes::Subtype,
    table::{Delimiter, Table},
    tri::Tri,
    util::header,
};

pub type ArcStr = Arc<str>;
pub type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
