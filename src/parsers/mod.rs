// ==============================================================================
// parsers/mod.rs - File parser modules
// ==============================================================================
// Description: Parsers for the lookup, variant, heterozygosity, phenotype and
//              genotype input formats
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

pub mod het;
pub mod phenotype;
pub mod pvar;
pub mod rsid_table;
pub mod vcf;

pub use het::{HetParseError, HetParser};
pub use phenotype::{PhenotypeParseError, PhenotypeTable};
pub use pvar::{PvarParseError, PvarParser};
pub use rsid_table::{RsidTableError, RsidTableParser};
pub use vcf::{VcfParseError, VcfParser};
