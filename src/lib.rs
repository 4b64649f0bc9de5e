// ==============================================================================
// lib.rs - GWAS QC Tools Library
// ==============================================================================
// Description: Library interface for the rsID joiner, heterozygosity filter
//              and GWAS runner
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================

pub mod genotype_matrix;
pub mod gwas;
pub mod het_filter;
pub mod joiner;
pub mod logging;
pub mod models;
pub mod output;
pub mod parsers;
