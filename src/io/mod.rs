pub mod aln;
pub mod fasta;
