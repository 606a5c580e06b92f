// ==========================================
// DMC 发票系统 - 引擎层
// ==========================================
// 职责: 费率规范化、名称规范化、疑似重复检测、记录划分、发票组装、运行编排
// 红线: 分类只走显式划分,不走错误通道
// ==========================================

pub mod canonicalizer;
pub mod duplicate_detector;
pub mod events;
pub mod invoice_assembler;
pub mod orchestrator;
pub mod rate_normalizer;
pub mod validation_pipeline;

// 重导出核心引擎
pub use canonicalizer::{canonicalize, normalize_service_type, title_case, VendorCanonicalizer};
pub use duplicate_detector::{levenshtein, DuplicateDetector};
pub use events::{ChannelProgressSink, CollectingProgressSink, ProgressReporter, ProgressSink};
pub use invoice_assembler::{assemble, AssemblyError, InvoiceAssembler};
pub use orchestrator::{InvoiceRun, RestaurantSummary, RunError, RunRequest, RunSummary};
pub use rate_normalizer::RateNormalizer;
pub use validation_pipeline::{partition, PartitionResult, ValidationPipeline};
