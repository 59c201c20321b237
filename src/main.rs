use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::Path;

use hbf_mapper::align::{self, ScoringParams};
use hbf_mapper::config::{LayerSpec, MapperConfig};
use hbf_mapper::index::{builder, IndexMeta, Layout, MapperIndex};
use hbf_mapper::io;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser, Debug)]
#[command(
    name = "hbf-mapper",
    author,
    version,
    about = "Short-read mapper built on a hierarchical cascade of Bloom filters",
    arg_required_else_help = true
)]
struct Cli {
    /// Log more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the filter cascade of a reference and save it as <output>.hbf
    Index {
        /// Reference FASTA file
        reference: String,
        /// Output prefix for the index snapshot and layer dumps
        #[arg(short, long, default_value = "ref")]
        output: String,
        /// Also write raw layer memories to <output>.layer<k>.dat
        #[arg(long = "dump-bin")]
        dump_bin: bool,
        /// Also write layer memories as hex to <output>.layer<k>.hex
        #[arg(long = "dump-hex")]
        dump_hex: bool,
        #[command(flatten)]
        params: ParamArgs,
    },
    /// Map simulated reads (.aln) and report how many land on their origin
    Map {
        /// Simulated reads with known origins
        reads: String,
        /// Index snapshot (.hbf) from the `index` subcommand
        #[arg(short = 'i', long = "index", conflicts_with = "reference")]
        index: Option<String>,
        /// Reference FASTA to build the cascade from
        #[arg(short = 'r', long = "reference", required_unless_present = "index")]
        reference: Option<String>,
        /// Restore layer memories from <PREFIX>.layer<k>.dat instead of inserting
        #[arg(long = "load-bin", value_name = "PREFIX", requires = "reference")]
        load_bin: Option<String>,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
        #[command(flatten)]
        params: ParamArgs,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LayoutArg {
    /// Sibling filters stored one after another
    Grouped,
    /// Bit i of every sibling stored side by side
    Interleaved,
}

impl From<LayoutArg> for Layout {
    fn from(v: LayoutArg) -> Self {
        match v {
            LayoutArg::Grouped => Layout::Grouped,
            LayoutArg::Interleaved => Layout::Interleaved,
        }
    }
}

/// 映射参数（索引几何 + 查询阈值 + 打分）
#[derive(Args, Debug)]
struct ParamArgs {
    #[arg(long = "read-len", default_value_t = 100)]
    read_len: usize,
    #[arg(short = 'k', long = "seed-len", default_value_t = 20)]
    seed_len: usize,
    /// Step between queried read seeds
    #[arg(long = "query-shift", default_value_t = 1)]
    query_shift: usize,
    /// Seed hits a filter needs to become a candidate
    #[arg(long = "hit-threshold", default_value_t = 70)]
    hit_threshold: u32,
    /// Largest distance from the known origin still counted as correct
    #[arg(long = "answer-margin", default_value_t = 20)]
    answer_margin: u64,
    /// Accepted filters per layer above which a read is a satellite
    #[arg(long = "satellite-threshold", default_value_t = 15)]
    satellite_threshold: u32,
    /// Cascade layer SIZE:AMOUNT:RANGE[:TOTAL], root first (default: hg38 layout)
    #[arg(long = "layer", value_name = "SPEC")]
    layers: Vec<LayerSpec>,
    #[arg(long, value_enum, default_value_t = LayoutArg::Interleaved)]
    layout: LayoutArg,
    #[arg(long = "hash-seed", default_value_t = hbf_mapper::config::DEFAULT_HASH_SEED)]
    hash_seed: u64,
    /// Count seeds first and leave repetitive ones out of the filters
    #[arg(long = "filter-repeats")]
    filter_repeats: bool,
    /// Stop reading the reference after this many bases
    #[arg(long = "max-ref-len")]
    max_ref_len: Option<usize>,
    /// Stop after this many forward-strand reads
    #[arg(long = "max-reads")]
    max_reads: Option<usize>,
    #[arg(long = "match", default_value_t = 1)]
    match_score: i32,
    #[arg(long = "mismatch", default_value_t = -1, allow_hyphen_values = true)]
    mismatch_score: i32,
    #[arg(long = "gap-open", default_value_t = -3, allow_hyphen_values = true)]
    gap_open: i32,
    #[arg(long = "gap-ext", default_value_t = -2, allow_hyphen_values = true)]
    gap_extend: i32,
}

impl ParamArgs {
    fn to_config(&self) -> Result<MapperConfig> {
        let mut cfg = if self.layers.is_empty() {
            MapperConfig::hg38()
        } else {
            MapperConfig::with_layers(self.layers.clone())
        };
        cfg.layout = self.layout.into();
        cfg.hash_seed = self.hash_seed;
        cfg.seed_len = self.seed_len;
        cfg.filter_repeats = self.filter_repeats;
        cfg.max_ref_len = self.max_ref_len;
        self.apply_query(&mut cfg);
        cfg.validate()?;
        Ok(cfg)
    }

    /// Overrides the parameters that only matter at mapping time.
    fn apply_query(&self, cfg: &mut MapperConfig) {
        cfg.read_len = self.read_len;
        cfg.query_shift = self.query_shift;
        cfg.hit_threshold = self.hit_threshold;
        cfg.answer_margin = self.answer_margin;
        cfg.satellite_threshold = self.satellite_threshold;
        cfg.max_reads = self.max_reads;
        cfg.scoring = ScoringParams {
            match_score: self.match_score,
            mismatch_score: self.mismatch_score,
            gap_open: self.gap_open,
            gap_extend: self.gap_extend,
        };
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None)
        .format_target(false)
        .init();

    match cli.command {
        Commands::Index { reference, output, dump_bin, dump_hex, params } => {
            run_index(&reference, &output, dump_bin, dump_hex, &params)
        }
        Commands::Map { reads, index, reference, load_bin, threads, params } => {
            run_map(&reads, index.as_deref(), reference.as_deref(), load_bin.as_deref(), threads, &params)
        }
    }
}

fn build_from_fasta(reference: &str, cfg: MapperConfig) -> Result<MapperIndex> {
    let seq = io::fasta::read_reference(reference, cfg.max_ref_len)?;
    if seq.is_empty() {
        bail!("FASTA file '{}' contains only empty sequences", reference);
    }
    println!("reference: {}", reference);
    println!("total_len: {}", seq.len());
    MapperIndex::build(cfg, seq)
}

fn run_index(reference: &str, output: &str, dump_bin: bool, dump_hex: bool, params: &ParamArgs) -> Result<()> {
    let cfg = params.to_config()?;
    let mut idx = build_from_fasta(reference, cfg)?;
    idx.set_meta(IndexMeta {
        reference_file: Some(reference.to_string()),
        build_args: Some(std::env::args().collect::<Vec<_>>().join(" ")),
        build_timestamp: Some(chrono::Utc::now().to_rfc3339()),
    });

    let prefix = Path::new(output);
    if dump_bin {
        idx.cascade.write_bin(prefix)?;
    }
    if dump_hex {
        idx.cascade.write_hex(prefix)?;
    }

    let out_path = format!("{}.hbf", output);
    idx.save_to_file(&out_path)
        .map_err(|e| anyhow!("cannot write index to '{}': {}", out_path, e))?;
    println!("index saved: {}", out_path);
    Ok(())
}

fn run_map(
    reads: &str,
    index: Option<&str>,
    reference: Option<&str>,
    load_bin: Option<&str>,
    threads: usize,
    params: &ParamArgs,
) -> Result<()> {
    let idx = match (index, reference) {
        (Some(path), _) => {
            let mut idx = MapperIndex::load_from_file(path)
                .map_err(|e| anyhow!("cannot load index '{}': {}", path, e))?;
            params.apply_query(&mut idx.config);
            idx.config.validate()?;
            log::info!(
                "loaded index of {} bases built {}",
                idx.reference.len(),
                idx.meta.build_timestamp.as_deref().unwrap_or("at an unknown time")
            );
            idx
        }
        (None, Some(fasta)) => {
            let cfg = params.to_config()?;
            match load_bin {
                Some(prefix) => {
                    let seq = io::fasta::read_reference(fasta, cfg.max_ref_len)?;
                    builder::load_from_dumps(cfg, &seq, Path::new(prefix))?
                }
                None => build_from_fasta(fasta, cfg)?,
            }
        }
        (None, None) => bail!("either --index or --reference is required"),
    };

    let board = align::map_aln_file(&idx, reads, threads.max(1))?;
    println!("{}", board);
    Ok(())
}
