//! # hbf-mapper
//!
//! 基于分层布隆过滤器（Hierarchical Bloom Filter）的短读段比对器。
//!
//! 索引由若干层位打包的布隆过滤器组成，自粗到细逐层划分参考序列坐标；
//! 读段的每个种子（seed）在各层累计命中次数，命中足够多的过滤器才进入下一层，
//! 最终在叶子层得到候选位置（CML），再用仿射间隙 Smith-Waterman 打分选出最佳位置（BML）。
//!
//! - **过滤器层**：`bf_total` 个单哈希布隆过滤器共享一块 `u32` 位内存，支持分组与交错两种布局
//! - **级联搜索**：自适应阈值、卫星序列（高度重复区域）检测、多分支展开
//! - **局部比对**：三状态仿射间隙局部对齐，滚动行缓冲区
//! - **索引构建**：单遍流式插入，可选先统计种子频次以剔除重复种子
//!
//! ## 快速示例
//!
//! ```rust
//! use hbf_mapper::config::{LayerSpec, MapperConfig};
//! use hbf_mapper::index::MapperIndex;
//! use hbf_mapper::align::{map_read, BestMatch, ReadOutcome};
//!
//! let mut cfg = MapperConfig::with_layers(vec![
//!     LayerSpec::new(4096, 4, 0, 1024),
//!     LayerSpec::new(4096, 16, 0, 64),
//! ]);
//! cfg.seed_len = 12;
//! cfg.read_len = 40;
//! cfg.hit_threshold = 20;
//!
//! let mut x: u32 = 42;
//! let reference: Vec<u8> = (0..4096)
//!     .map(|_| {
//!         x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345);
//!         b"ACGT"[((x >> 16) % 4) as usize]
//!     })
//!     .collect();
//! let index = MapperIndex::build(cfg.clone(), reference.clone()).unwrap();
//!
//! let mut best = BestMatch::new(cfg.scoring);
//! let outcome = map_read(&index, &reference[1500..1540], &mut best);
//! assert!(matches!(outcome, ReadOutcome::Mapped { location: Some(1500), .. }));
//! ```
//!
//! ## 模块说明
//!
//! - [`config`] — 映射参数、层几何配置与校验
//! - [`index`] — 过滤器层、级联、种子计数与索引构建 / 持久化
//! - [`align`] — 级联搜索、局部比对、最佳位置选择与批量映射
//! - [`io`] — 参考序列 FASTA 与模拟读段（.aln）解析
//! - [`util`] — 2-bit 碱基编码、滚动种子窗口与统计工具

pub mod align;
pub mod config;
pub mod index;
pub mod io;
pub mod util;
