// ==============================================================================
// genotype_matrix.rs - In-Memory Genotype Matrix
// ==============================================================================
// Description: Variants x samples genotype calls with QC and multi-allelic split
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.1.0
// ==============================================================================
// Splitting:
//   A site with alleles [REF, ALT1, ALT2] becomes two biallelic records
//   [REF, ALT1] and [REF, ALT2]. Calls are downcoded per record: the split
//   allele becomes 1, every other allele becomes 0 (e.g. 1/2 -> 0/1 and 0/1).
//   Each record is then reduced to its minimal representation.
// ==============================================================================

use std::collections::HashMap;

/// Reference build assumed when the input does not name one
pub const DEFAULT_REFERENCE_GENOME: &str = "GRCh37";

/// A single genotype call as allele indices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Missing,
    Haploid(u16),
    Diploid(u16, u16),
}

impl Call {
    pub fn is_called(&self) -> bool {
        !matches!(self, Call::Missing)
    }

    /// Number of allele calls contributed to allele-number totals
    pub fn ploidy(&self) -> u32 {
        match self {
            Call::Missing => 0,
            Call::Haploid(_) => 1,
            Call::Diploid(_, _) => 2,
        }
    }

    /// Count of non-reference alleles; None for a missing call
    pub fn n_alt_alleles(&self) -> Option<u32> {
        match *self {
            Call::Missing => None,
            Call::Haploid(a) => Some(u32::from(a != 0)),
            Call::Diploid(a, b) => Some(u32::from(a != 0) + u32::from(b != 0)),
        }
    }

    /// Re-express the call against a biallelic [REF, allele] record
    pub fn downcode(&self, allele: u16) -> Call {
        let code = |a: u16| u16::from(a == allele);
        match *self {
            Call::Missing => Call::Missing,
            Call::Haploid(a) => Call::Haploid(code(a)),
            Call::Diploid(a, b) => Call::Diploid(code(a), code(b)),
        }
    }
}

/// Row (variant) metadata
#[derive(Debug, Clone, PartialEq)]
pub struct VariantSite {
    pub contig: String,
    pub position: u64,
    /// alleles[0] is REF, the rest are ALT alleles
    pub alleles: Vec<String>,
    pub rsid: Option<String>,
}

impl VariantSite {
    pub fn ref_allele(&self) -> &str {
        &self.alleles[0]
    }

    /// First alternate allele
    pub fn alt_allele(&self) -> Option<&str> {
        self.alleles.get(1).map(|a| a.as_str())
    }
}

/// Genotype matrix: `calls[variant][sample]`
#[derive(Debug, Clone)]
pub struct GenotypeMatrix {
    pub sample_ids: Vec<String>,
    pub variants: Vec<VariantSite>,
    pub calls: Vec<Vec<Call>>,
    /// Contig sort order (header order, then first appearance)
    pub contigs: Vec<String>,
    /// Whether the input carried an rsID field
    pub has_rsid_field: bool,
    pub reference_genome: String,
}

impl GenotypeMatrix {
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    pub fn n_variants(&self) -> usize {
        self.variants.len()
    }

    /// Keep samples whose mask entry is true
    pub fn retain_samples(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.sample_ids.len());

        self.sample_ids = self
            .sample_ids
            .drain(..)
            .zip(keep)
            .filter_map(|(id, &k)| k.then_some(id))
            .collect();

        for row in &mut self.calls {
            *row = row
                .iter()
                .zip(keep)
                .filter_map(|(call, &k)| k.then_some(*call))
                .collect();
        }
    }

    /// Keep variants whose mask entry is true
    pub fn retain_variants(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.variants.len());

        let mut mask = keep.iter();
        self.variants.retain(|_| *mask.next().unwrap_or(&false));
        let mut mask = keep.iter();
        self.calls.retain(|_| *mask.next().unwrap_or(&false));
    }

    /// Fraction of variants with a non-missing call, per sample
    ///
    /// With zero variants every rate is NaN and fails any threshold.
    pub fn sample_call_rates(&self) -> Vec<f64> {
        let mut called = vec![0usize; self.n_samples()];
        for row in &self.calls {
            for (count, call) in called.iter_mut().zip(row) {
                if call.is_called() {
                    *count += 1;
                }
            }
        }

        let n_rows = self.n_variants() as f64;
        called.into_iter().map(|c| c as f64 / n_rows).collect()
    }

    /// Frequency of allele 1 among called alleles, per variant
    ///
    /// None when no sample has a call at the variant.
    pub fn alt_allele_freqs(&self) -> Vec<Option<f64>> {
        self.calls
            .iter()
            .map(|row| {
                let mut allele_number = 0u32;
                let mut alt_count = 0u32;
                for call in row {
                    allele_number += call.ploidy();
                    alt_count += match *call {
                        Call::Missing => 0,
                        Call::Haploid(a) => u32::from(a == 1),
                        Call::Diploid(a, b) => u32::from(a == 1) + u32::from(b == 1),
                    };
                }
                (allele_number > 0).then(|| f64::from(alt_count) / f64::from(allele_number))
            })
            .collect()
    }

    /// Alternate-allele dosage of every sample at one variant
    pub fn dosages(&self, variant: usize) -> Vec<Option<f64>> {
        self.calls[variant]
            .iter()
            .map(|call| call.n_alt_alleles().map(f64::from))
            .collect()
    }

    /// Split multi-allelic sites and merge them back with the biallelic ones
    ///
    /// Sites without an alternate allele are dropped. The result is sorted by
    /// contig order, position and alleles.
    pub fn split_multi(self) -> Self {
        let GenotypeMatrix {
            sample_ids,
            variants,
            calls,
            contigs,
            has_rsid_field,
            reference_genome,
        } = self;

        let mut rows: Vec<(VariantSite, Vec<Call>)> = Vec::with_capacity(variants.len());
        for (site, row) in variants.into_iter().zip(calls) {
            match site.alleles.len() {
                0 | 1 => continue,
                2 => rows.push((site, row)),
                n => {
                    for allele in 1..n {
                        let (position, ref_allele, alt_allele) =
                            min_rep(site.position, &site.alleles[0], &site.alleles[allele]);
                        let split_site = VariantSite {
                            contig: site.contig.clone(),
                            position,
                            alleles: vec![ref_allele, alt_allele],
                            rsid: site.rsid.clone(),
                        };
                        let split_row = row.iter().map(|c| c.downcode(allele as u16)).collect();
                        rows.push((split_site, split_row));
                    }
                }
            }
        }

        let mut contig_rank: HashMap<&str, usize> = HashMap::new();
        for contig in &contigs {
            let next = contig_rank.len();
            contig_rank.entry(contig.as_str()).or_insert(next);
        }
        let unknown_rank = contig_rank.len();
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by(|&a, &b| {
            let (sa, sb) = (&rows[a].0, &rows[b].0);
            let ra = contig_rank.get(sa.contig.as_str()).copied().unwrap_or(unknown_rank);
            let rb = contig_rank.get(sb.contig.as_str()).copied().unwrap_or(unknown_rank);
            ra.cmp(&rb)
                .then_with(|| sa.contig.cmp(&sb.contig))
                .then_with(|| sa.position.cmp(&sb.position))
                .then_with(|| sa.alleles.cmp(&sb.alleles))
        });

        let mut slots: Vec<Option<(VariantSite, Vec<Call>)>> = rows.into_iter().map(Some).collect();
        let mut variants = Vec::with_capacity(slots.len());
        let mut calls = Vec::with_capacity(slots.len());
        for idx in order {
            if let Some((site, row)) = slots[idx].take() {
                variants.push(site);
                calls.push(row);
            }
        }

        GenotypeMatrix {
            sample_ids,
            variants,
            calls,
            contigs,
            has_rsid_field,
            reference_genome,
        }
    }
}

/// Minimal representation of a REF/ALT pair
///
/// Trims the shared suffix, then the shared prefix (moving the position),
/// always leaving at least one base on each allele.
pub fn min_rep(position: u64, ref_allele: &str, alt_allele: &str) -> (u64, String, String) {
    let r = ref_allele.as_bytes();
    let a = alt_allele.as_bytes();

    if (r.len() == 1 && a.len() == 1) || alt_allele == "*" {
        return (position, ref_allele.to_string(), alt_allele.to_string());
    }

    let mut ref_end = r.len();
    let mut alt_end = a.len();
    while ref_end > 1 && alt_end > 1 && r[ref_end - 1] == a[alt_end - 1] {
        ref_end -= 1;
        alt_end -= 1;
    }

    let mut start = 0;
    while start + 1 < ref_end && start + 1 < alt_end && r[start] == a[start] {
        start += 1;
    }

    (
        position + start as u64,
        ref_allele[start..ref_end].to_string(),
        alt_allele[start..alt_end].to_string(),
    )
}
