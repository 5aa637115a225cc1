use crate::domain::model::{CreationRequest, ProductGroup, ProductSchema};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 前置階段提升到執行上下文的值
#[derive(Debug, Clone)]
pub enum ContextValue {
    B2bCustomerGroup(String),
    ProductSchemas(Arc<Vec<ProductSchema>>),
}

impl ContextValue {
    pub fn label(&self) -> &'static str {
        match self {
            ContextValue::B2bCustomerGroup(_) => "b2bCustomerGroupId",
            ContextValue::ProductSchemas(_) => "productTypes",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Setup,
    Chunk,
}

/// 單一階段的執行結果
#[derive(Debug, Clone)]
pub struct StageResult {
    pub stage_name: String,
    pub kind: StageKind,
    pub items_read: usize,
    pub items_filtered: usize,
    pub items_written: usize,
    pub chunks: usize,
    pub promoted: Vec<&'static str>,
    pub duration: Duration,
}

impl StageResult {
    fn new(stage_name: &str, kind: StageKind) -> Self {
        Self {
            stage_name: stage_name.to_string(),
            kind,
            items_read: 0,
            items_filtered: 0,
            items_written: 0,
            chunks: 0,
            promoted: Vec::new(),
            duration: Duration::ZERO,
        }
    }
}

/// 整次執行共用、具型別的上下文
#[derive(Debug, Clone)]
pub struct RunContext {
    pub execution_id: String,
    pub b2b_customer_group_id: Option<String>,
    pub product_schemas: Option<Arc<Vec<ProductSchema>>>,
    pub previous_results: Vec<StageResult>,
}

impl RunContext {
    pub fn new(execution_id: String) -> Self {
        Self {
            execution_id,
            b2b_customer_group_id: None,
            product_schemas: None,
            previous_results: Vec::new(),
        }
    }

    pub fn promote(&mut self, value: ContextValue) {
        match value {
            ContextValue::B2bCustomerGroup(id) => self.b2b_customer_group_id = Some(id),
            ContextValue::ProductSchemas(schemas) => self.product_schemas = Some(schemas),
        }
    }

    pub fn get_previous_result(&self) -> Option<&StageResult> {
        self.previous_results.last()
    }

    pub fn get_result_by_name(&self, name: &str) -> Option<&StageResult> {
        self.previous_results.iter().find(|r| r.stage_name == name)
    }

    fn add_result(&mut self, result: StageResult) {
        self.previous_results.push(result);
    }
}

/// 只執行一次的前置階段，產出要提升到上下文的值
#[async_trait]
pub trait SetupStage: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, context: &RunContext) -> Result<Vec<ContextValue>>;
}

/// 分批讀取端；來源耗盡時回傳空 Vec
pub trait ChunkReader: Send {
    fn read_chunk(&mut self, limit: usize) -> Result<Vec<ProductGroup>>;
}

/// 讀取 → 轉換 → 寫入的分批階段
#[async_trait]
pub trait ChunkStage: Send + Sync {
    fn name(&self) -> &str;
    fn chunk_size(&self) -> usize;
    async fn open(&self, context: &RunContext) -> Result<Box<dyn ChunkReader>>;
    /// 已濾除無輸出的項目
    async fn process(&self, items: Vec<ProductGroup>) -> Result<Vec<CreationRequest>>;
    /// 回傳成功送出的數量
    async fn write(&self, requests: Vec<CreationRequest>) -> Result<usize>;
}

pub enum Stage {
    Setup(Box<dyn SetupStage>),
    Chunk(Box<dyn ChunkStage>),
}

impl Stage {
    pub fn name(&self) -> &str {
        match self {
            Stage::Setup(stage) => stage.name(),
            Stage::Chunk(stage) => stage.name(),
        }
    }
}

/// 依宣告順序執行階段；任何錯誤立即中止整次執行
pub struct PipelineSequence {
    stages: Vec<Stage>,
    monitor: Option<SystemMonitor>,
    execution_id: String,
}

impl PipelineSequence {
    pub fn new(execution_id: String) -> Self {
        Self {
            stages: Vec::new(),
            monitor: None,
            execution_id,
        }
    }

    /// 啟用或禁用系統監控
    pub fn with_monitoring(mut self, enabled: bool) -> Self {
        self.monitor = enabled.then(|| SystemMonitor::new(true));
        self
    }

    pub fn add_setup_stage(&mut self, stage: Box<dyn SetupStage>) {
        self.stages.push(Stage::Setup(stage));
    }

    pub fn add_chunk_stage(&mut self, stage: Box<dyn ChunkStage>) {
        self.stages.push(Stage::Chunk(stage));
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(Stage::name).collect()
    }

    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// 執行所有階段，回傳最終上下文（含每個階段的結果）
    pub async fn execute_all(&self) -> Result<RunContext> {
        let mut context = RunContext::new(self.execution_id.clone());

        if let Some(monitor) = &self.monitor {
            monitor.log_stats("Run started");
        }

        for stage in &self.stages {
            let start_time = Instant::now();
            tracing::info!("▶️ Starting stage: {}", stage.name());

            let outcome = match stage {
                Stage::Setup(setup) => Self::run_setup(setup.as_ref(), &mut context).await,
                Stage::Chunk(chunked) => Self::run_chunked(chunked.as_ref(), &context).await,
            };

            match outcome {
                Ok(mut result) => {
                    result.duration = start_time.elapsed();
                    tracing::info!(
                        "✅ Stage executed: {} (read: {}, filtered: {}, written: {}, duration: {:?})",
                        result.stage_name,
                        result.items_read,
                        result.items_filtered,
                        result.items_written,
                        result.duration
                    );
                    if let Some(monitor) = &self.monitor {
                        monitor.log_stats(&result.stage_name);
                    }
                    context.add_result(result);
                }
                Err(e) => {
                    tracing::error!("❌ Stage '{}' failed, halting run: {}", stage.name(), e);
                    return Err(e);
                }
            }
        }

        if let Some(monitor) = &self.monitor {
            monitor.log_final_stats();
        }

        Ok(context)
    }

    async fn run_setup(stage: &dyn SetupStage, context: &mut RunContext) -> Result<StageResult> {
        let values = stage.run(context).await?;
        let mut result = StageResult::new(stage.name(), StageKind::Setup);

        for value in values {
            tracing::debug!("📌 {}: promoting '{}' into run context", stage.name(), value.label());
            result.promoted.push(value.label());
            context.promote(value);
        }

        Ok(result)
    }

    async fn run_chunked(stage: &dyn ChunkStage, context: &RunContext) -> Result<StageResult> {
        let mut result = StageResult::new(stage.name(), StageKind::Chunk);
        let mut reader = stage.open(context).await?;

        loop {
            let items = reader.read_chunk(stage.chunk_size())?;
            if items.is_empty() {
                break;
            }

            let read = items.len();
            let requests = stage.process(items).await?;
            let filtered = read - requests.len();
            let written = stage.write(requests).await?;

            result.chunks += 1;
            result.items_read += read;
            result.items_filtered += filtered;
            result.items_written += written;

            tracing::info!(
                "📦 {}: chunk {} done (read: {}, filtered: {}, written: {})",
                stage.name(),
                result.chunks,
                read,
                filtered,
                written
            );
        }

        Ok(result)
    }

    /// 獲取執行摘要
    pub fn get_execution_summary(results: &[StageResult]) -> HashMap<String, serde_json::Value> {
        let mut summary = HashMap::new();

        let total_written: usize = results.iter().map(|r| r.items_written).sum();
        let total_filtered: usize = results.iter().map(|r| r.items_filtered).sum();
        let total_duration: Duration = results.iter().map(|r| r.duration).sum();

        summary.insert("total_stages".to_string(), serde_json::Value::from(results.len()));
        summary.insert("total_written".to_string(), serde_json::Value::from(total_written));
        summary.insert("total_filtered".to_string(), serde_json::Value::from(total_filtered));
        summary.insert(
            "total_duration_ms".to_string(),
            serde_json::Value::from(total_duration.as_millis() as u64),
        );

        let stage_names: Vec<serde_json::Value> = results
            .iter()
            .map(|r| serde_json::Value::String(r.stage_name.clone()))
            .collect();
        summary.insert("executed_stages".to_string(), serde_json::Value::Array(stage_names));

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Reference, Row};
    use crate::utils::error::ImportError;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    type EventLog = Arc<Mutex<Vec<String>>>;

    struct MockSetup {
        name: String,
        values: Vec<ContextValue>,
        events: EventLog,
        fail: bool,
    }

    #[async_trait]
    impl SetupStage for MockSetup {
        fn name(&self) -> &str {
            &self.name
        }

        async fn run(&self, _context: &RunContext) -> Result<Vec<ContextValue>> {
            self.events.lock().unwrap().push(format!("setup:{}", self.name));
            if self.fail {
                return Err(ImportError::Timeout {
                    operation: self.name.clone(),
                    seconds: 30,
                });
            }
            Ok(self.values.clone())
        }
    }

    struct VecReader {
        items: Vec<ProductGroup>,
    }

    impl ChunkReader for VecReader {
        fn read_chunk(&mut self, limit: usize) -> Result<Vec<ProductGroup>> {
            let take = limit.min(self.items.len());
            Ok(self.items.drain(..take).collect())
        }
    }

    /// 以 sku 以 "skip" 開頭表示轉換後為 None
    struct MockChunkStage {
        skus: Vec<&'static str>,
        chunk_size: usize,
        events: EventLog,
        seen_group_id: Arc<Mutex<Option<String>>>,
    }

    #[async_trait]
    impl ChunkStage for MockChunkStage {
        fn name(&self) -> &str {
            "mockImport"
        }

        fn chunk_size(&self) -> usize {
            self.chunk_size
        }

        async fn open(&self, context: &RunContext) -> Result<Box<dyn ChunkReader>> {
            self.events.lock().unwrap().push("chunk:open".to_string());
            *self.seen_group_id.lock().unwrap() = context.b2b_customer_group_id.clone();
            let items = self
                .skus
                .iter()
                .enumerate()
                .map(|(i, sku)| ProductGroup::new(Row::from_pairs(i + 2, &[("sku", sku)])))
                .collect();
            Ok(Box::new(VecReader { items }))
        }

        async fn process(&self, items: Vec<ProductGroup>) -> Result<Vec<CreationRequest>> {
            Ok(items
                .iter()
                .filter(|g| !g.first().get("sku").unwrap_or("").starts_with("skip"))
                .map(|_| CreationRequest {
                    product_type: Reference::product_type("pt"),
                    name: BTreeMap::new(),
                    slug: BTreeMap::new(),
                    variants: vec![],
                })
                .collect())
        }

        async fn write(&self, requests: Vec<CreationRequest>) -> Result<usize> {
            self.events
                .lock()
                .unwrap()
                .push(format!("chunk:write:{}", requests.len()));
            Ok(requests.len())
        }
    }

    fn setup(name: &str, values: Vec<ContextValue>, events: &EventLog) -> Box<MockSetup> {
        Box::new(MockSetup {
            name: name.to_string(),
            values,
            events: events.clone(),
            fail: false,
        })
    }

    #[tokio::test]
    async fn test_stages_run_in_order_and_promote_context() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));
        let seen_group_id = Arc::new(Mutex::new(None));

        let mut sequence = PipelineSequence::new("test-run".to_string());
        sequence.add_setup_stage(setup(
            "getOrCreateCustomerGroupStep",
            vec![ContextValue::B2bCustomerGroup("cg-1".to_string())],
            &events,
        ));
        sequence.add_setup_stage(setup(
            "getProductTypesStep",
            vec![ContextValue::ProductSchemas(Arc::new(vec![]))],
            &events,
        ));
        sequence.add_chunk_stage(Box::new(MockChunkStage {
            skus: vec!["A", "skip-1", "B", "C", "skip-2"],
            chunk_size: 2,
            events: events.clone(),
            seen_group_id: seen_group_id.clone(),
        }));

        let context = sequence.execute_all().await.unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "setup:getOrCreateCustomerGroupStep",
                "setup:getProductTypesStep",
                "chunk:open",
                "chunk:write:1",
                "chunk:write:2",
                "chunk:write:0",
            ]
        );
        assert_eq!(seen_group_id.lock().unwrap().as_deref(), Some("cg-1"));
        assert_eq!(context.b2b_customer_group_id.as_deref(), Some("cg-1"));
        assert!(context.product_schemas.is_some());

        let import = context.get_result_by_name("mockImport").unwrap();
        assert_eq!(import.kind, StageKind::Chunk);
        assert_eq!(import.chunks, 3);
        assert_eq!(import.items_read, 5);
        assert_eq!(import.items_filtered, 2);
        assert_eq!(import.items_written, 3);
        assert_eq!(
            context.get_previous_result().unwrap().stage_name,
            "mockImport"
        );
        assert_eq!(
            context.previous_results[0].promoted,
            vec!["b2bCustomerGroupId"]
        );
    }

    #[tokio::test]
    async fn test_failed_stage_halts_the_run() {
        let events: EventLog = Arc::new(Mutex::new(Vec::new()));

        let mut sequence = PipelineSequence::new("failing-run".to_string());
        sequence.add_setup_stage(Box::new(MockSetup {
            name: "broken".to_string(),
            values: vec![],
            events: events.clone(),
            fail: true,
        }));
        sequence.add_chunk_stage(Box::new(MockChunkStage {
            skus: vec!["A"],
            chunk_size: 20,
            events: events.clone(),
            seen_group_id: Arc::new(Mutex::new(None)),
        }));

        let outcome = sequence.execute_all().await;

        assert!(matches!(outcome, Err(ImportError::Timeout { .. })));
        assert_eq!(*events.lock().unwrap(), vec!["setup:broken"]);
    }

    #[test]
    fn test_execution_summary() {
        let mut setup = StageResult::new("getProductTypesStep", StageKind::Setup);
        setup.duration = Duration::from_millis(100);
        let mut import = StageResult::new("productsImportStep", StageKind::Chunk);
        import.items_written = 7;
        import.items_filtered = 2;
        import.duration = Duration::from_millis(200);

        let summary = PipelineSequence::get_execution_summary(&[setup, import]);

        assert_eq!(summary["total_stages"], serde_json::Value::from(2));
        assert_eq!(summary["total_written"], serde_json::Value::from(7));
        assert_eq!(summary["total_filtered"], serde_json::Value::from(2));
        assert_eq!(summary["total_duration_ms"], serde_json::Value::from(300));
        assert_eq!(
            summary["executed_stages"],
            serde_json::json!(["getProductTypesStep", "productsImportStep"])
        );
    }
}
