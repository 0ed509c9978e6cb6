//! # sga-overlap
//!
//! 基于 FM 索引的读段两两重叠发现，用于字符串图（string graph）组装。
//!
//! 本 crate 提供：
//!
//! - **索引构建**：读段集合及其反转的多串 BWT / FM 索引与采样后缀数组
//! - **反向搜索**：精确与带错配的（种子 + 双向扩展）后缀-前缀匹配
//! - **重叠算法**：双链四向搜索、包含关系判定、不可约（传递）边约简
//! - **任务分发**：串行 / 多线程处理框架，按输入顺序汇总结果
//! - **输出**：压缩命中文件与 ASQG 图文件
//!
//! ## 快速示例
//!
//! ```rust,no_run
//! use sga_overlap::index::interval::IndexPair;
//! use sga_overlap::index::ReadIndex;
//! use sga_overlap::overlap::search::BackwardSearch;
//! use sga_overlap::util::dna;
//!
//! let reads: Vec<Vec<u8>> = [&b"AACCGGTT"[..], b"CCGGTTAA", b"TTAAGGCC"]
//!     .iter()
//!     .map(|r| dna::encode(r))
//!     .collect();
//! let idx = ReadIndex::build(&reads, 4).unwrap();
//!
//! // 查找前缀与第一条读段后缀重叠 >= 4 的读段
//! let pair = IndexPair::new(&idx.fwd.fm, &idx.rev.fm);
//! let engine = BackwardSearch::new(4, 0.0, 0, 0);
//! for hit in engine.exact_matches(pair, &reads[0]) {
//!     for row in hit.pair.primary.lower..hit.pair.primary.upper {
//!         println!("read {:?} overlaps by {}", idx.fwd.sa.read_id(row), hit.overlap_len);
//!     }
//! }
//! ```
//!
//! ## 模块说明
//!
//! - [`io`]：FASTA / FASTQ 读取、命中文件、ASQG 输出
//! - [`index`]：索引构建与加载（后缀数组、BWT、FM 索引、双向区间）
//! - [`overlap`]：反向搜索、重叠算法、不可约约简、结果解析与驱动
//! - [`process`]：通用串行 / 并行任务分发
//! - [`util`]：DNA 编码 / 解码 / 反向互补等工具函数

pub mod error;
pub mod index;
pub mod io;
pub mod overlap;
pub mod process;
pub mod util;
