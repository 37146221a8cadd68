pub mod assembler;
pub mod error;
pub mod graph; // Colored de Bruijn graph, chain compaction, path enumeration
pub mod hts; // BAM/CRAM sample names and window read recruitment
pub mod kmer;
pub mod params;
pub mod pipeline; // Window scheduler: worker pool + ordered flush driver
pub mod reference; // Indexed FASTA access behind the ReferenceReader trait
pub mod utils;
pub mod variant;
pub mod vcf_writer;
pub mod window; // Region parsing, padding, slicing, dense indexing

pub use error::{McError, Result};
pub use params::Params;
pub use pipeline::run_pipeline;
