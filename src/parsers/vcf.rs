// ==============================================================================
// parsers/vcf.rs - VCF Genotype Matrix Reader
// ==============================================================================
// Description: Loads GT calls from a VCF into a GenotypeMatrix using noodles-vcf
// Author: Matt Barham
// Created: 2026-10-17
// Modified: 2026-10-17
// Version: 0.2.0
// ==============================================================================
// References:
// - VCF 4.2 Spec: https://samtools.github.io/hts-specs/VCFv4.2.pdf
// - noodles-vcf: https://docs.rs/noodles-vcf/0.81.0/noodles_vcf/
// Input may be plain text, BGZF or plain gzip; compression is detected from
// the block header rather than the file extension.
// ==============================================================================

use flate2::read::MultiGzDecoder;
use noodles_bgzf as bgzf;
use noodles_vcf as vcf;
use noodles_vcf::header::record::value::Collection;
use noodles_vcf::variant::record::{AlternateBases, Ids};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::genotype_matrix::{Call, GenotypeMatrix, VariantSite, DEFAULT_REFERENCE_GENOME};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// FLG.FEXTRA bit of a gzip member header
const GZIP_FEXTRA: u8 = 0x04;
/// Subfield identifier BGZF stores in the gzip extra field
const BGZF_SUBFIELD: [u8; 2] = *b"BC";
const GENOTYPE_KEY: &str = "GT";

/// VCF parsing errors
#[derive(Error, Debug)]
pub enum VcfParseError {
    #[error("Failed to open VCF file: {0}")]
    FileOpenError(String),

    #[error("Failed to read VCF header: {0}")]
    HeaderError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid VCF record {record}: {details}")]
    InvalidRecord { record: usize, details: String },

    #[error("Missing GT in FORMAT of VCF record {0}")]
    MissingGenotypeField(usize),

    #[error("Invalid genotype '{value}' in VCF record {record}")]
    InvalidGenotype { record: usize, value: String },

    #[error("Unsupported ploidy {ploidy} in VCF record {record} (only haploid and diploid calls)")]
    UnsupportedPloidy { record: usize, ploidy: usize },
}

/// Compression of a VCF input stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    None,
    Bgzf,
    Gzip,
}

impl Compression {
    fn detect(header: &[u8]) -> Self {
        if header.len() < 2 || header[..2] != GZIP_MAGIC {
            return Compression::None;
        }
        let has_extra = header.get(3).is_some_and(|flags| flags & GZIP_FEXTRA != 0);
        if has_extra && header.get(12..14) == Some(&BGZF_SUBFIELD[..]) {
            Compression::Bgzf
        } else {
            Compression::Gzip
        }
    }
}

/// VCF reader producing an in-memory genotype matrix
#[derive(Debug, Default)]
pub struct VcfParser {
    /// Reference build to report instead of the one detected from the header
    pub reference_override: Option<String>,
}

impl VcfParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reference_genome(mut self, name: Option<String>) -> Self {
        self.reference_override = name;
        self
    }

    /// Read a VCF file (`.vcf`, `.vcf.gz` or `.vcf.bgz`)
    pub fn parse(&self, path: impl AsRef<Path>) -> Result<GenotypeMatrix, VcfParseError> {
        let path = path.as_ref();
        let open = || {
            File::open(path).map_err(|e| VcfParseError::FileOpenError(format!("{}: {}", path.display(), e)))
        };

        let mut block_header = Vec::with_capacity(18);
        open()?.take(18).read_to_end(&mut block_header)?;

        match Compression::detect(&block_header) {
            Compression::Bgzf => {
                debug!("Reading BGZF-compressed VCF: {:?}", path);
                self.parse_reader(bgzf::io::Reader::new(open()?))
            }
            Compression::Gzip => {
                debug!("Reading gzip-compressed VCF: {:?}", path);
                self.parse_reader(BufReader::new(MultiGzDecoder::new(open()?)))
            }
            Compression::None => {
                debug!("Reading plain-text VCF: {:?}", path);
                self.parse_reader(BufReader::new(open()?))
            }
        }
    }

    /// Read uncompressed VCF text from any buffered source
    pub fn parse_reader<R: BufRead>(&self, inner: R) -> Result<GenotypeMatrix, VcfParseError> {
        let mut reader = vcf::io::Reader::new(inner);
        let header = reader
            .read_header()
            .map_err(|e| VcfParseError::HeaderError(e.to_string()))?;

        let sample_ids: Vec<String> = header.sample_names().iter().cloned().collect();
        let mut contigs: Vec<String> = header.contigs().keys().cloned().collect();
        let mut seen_contigs: HashSet<String> = contigs.iter().cloned().collect();

        let mut variants = Vec::new();
        let mut calls = Vec::new();
        let mut has_rsid_field = false;

        for (idx, result) in reader.records().enumerate() {
            let record_number = idx + 1;
            let record = result.map_err(|e| VcfParseError::InvalidRecord {
                record: record_number,
                details: e.to_string(),
            })?;

            let (site, row) = convert_record(&record, record_number, sample_ids.len())?;

            if site.rsid.is_some() {
                has_rsid_field = true;
            }
            if seen_contigs.insert(site.contig.clone()) {
                contigs.push(site.contig.clone());
            }
            variants.push(site);
            calls.push(row);
        }

        let reference_genome = self
            .reference_override
            .clone()
            .or_else(|| detect_build(&header).map(|b| b.to_string()))
            .unwrap_or_else(|| DEFAULT_REFERENCE_GENOME.to_string());

        debug!(
            "Loaded VCF: {} samples, {} records, reference {}",
            sample_ids.len(),
            variants.len(),
            reference_genome
        );

        Ok(GenotypeMatrix {
            sample_ids,
            variants,
            calls,
            contigs,
            has_rsid_field,
            reference_genome,
        })
    }
}

/// Site metadata and per-sample calls of one record
fn convert_record(
    record: &vcf::Record,
    record_number: usize,
    n_samples: usize,
) -> Result<(VariantSite, Vec<Call>), VcfParseError> {
    let invalid = |details: String| VcfParseError::InvalidRecord {
        record: record_number,
        details,
    };

    let position = match record.variant_start() {
        Some(Ok(pos)) => usize::from(pos) as u64,
        Some(Err(e)) => return Err(invalid(format!("invalid position: {}", e))),
        None => return Err(invalid("missing position".to_string())),
    };

    let ids = record.ids();
    let rsid = ids.iter().next().map(|id| id.to_string());

    let mut alleles = vec![record.reference_bases().to_string()];
    for allele in record.alternate_bases().iter() {
        let allele = allele.map_err(|e| invalid(format!("invalid ALT allele: {}", e)))?;
        alleles.push(allele.to_string());
    }

    let samples = record.samples();
    let columns: &str = samples.as_ref();
    let row = genotype_row(columns, alleles.len(), record_number, n_samples)?;

    let site = VariantSite {
        contig: record.reference_sequence_name().to_string(),
        position,
        alleles,
        rsid,
    };

    Ok((site, row))
}

/// Calls from the FORMAT and sample columns of a record
fn genotype_row(
    columns: &str,
    n_alleles: usize,
    record_number: usize,
    n_samples: usize,
) -> Result<Vec<Call>, VcfParseError> {
    if n_samples == 0 {
        return Ok(Vec::new());
    }

    let mut fields = columns.split('\t');
    let format = fields.next().unwrap_or_default();
    let gt_idx = format
        .split(':')
        .position(|k| k == GENOTYPE_KEY)
        .ok_or(VcfParseError::MissingGenotypeField(record_number))?;

    let values: Vec<&str> = fields.collect();
    if values.len() != n_samples {
        return Err(VcfParseError::InvalidRecord {
            record: record_number,
            details: format!("expected {} sample columns, found {}", n_samples, values.len()),
        });
    }

    values
        .iter()
        .map(|sample| {
            let gt = sample.split(':').nth(gt_idx).unwrap_or(".");
            parse_genotype(gt, n_alleles, record_number)
        })
        .collect()
}

/// Parse a GT value such as `0/1`, `1|2`, `1` or `./.`
fn parse_genotype(gt: &str, n_alleles: usize, record_number: usize) -> Result<Call, VcfParseError> {
    let parts: Vec<&str> = gt.split(['/', '|']).collect();

    if parts.iter().any(|p| *p == ".") {
        return Ok(Call::Missing);
    }

    let mut indices = Vec::with_capacity(parts.len());
    for part in &parts {
        let allele = part
            .parse::<u16>()
            .ok()
            .filter(|&a| usize::from(a) < n_alleles)
            .ok_or_else(|| VcfParseError::InvalidGenotype {
                record: record_number,
                value: gt.to_string(),
            })?;
        indices.push(allele);
    }

    match indices.as_slice() {
        [a] => Ok(Call::Haploid(*a)),
        [a, b] => Ok(Call::Diploid(*a, *b)),
        _ => Err(VcfParseError::UnsupportedPloidy {
            record: record_number,
            ploidy: indices.len(),
        }),
    }
}

/// Build named by `##reference=` or, failing that, a contig `assembly` field
fn detect_build(header: &vcf::Header) -> Option<&'static str> {
    let from_reference = match header.get("reference") {
        Some(Collection::Unstructured(values)) => values.iter().find_map(|v| build_from_text(v)),
        _ => None,
    };

    from_reference.or_else(|| {
        header
            .contigs()
            .values()
            .filter_map(|contig| contig.other_fields().get("assembly"))
            .find_map(|assembly| build_from_text(assembly))
    })
}

/// Map free-text reference descriptions to a build name
fn build_from_text(text: &str) -> Option<&'static str> {
    let lower = text.to_ascii_lowercase();
    if lower.contains("grch38") || lower.contains("hg38") {
        Some("GRCh38")
    } else if lower.contains("grch37") || lower.contains("hg19") || lower.contains("b37") || lower.contains("hs37") {
        Some("GRCh37")
    } else {
        None
    }
}
