//! Pipeline integration tests.
//!
//! The rasteriser and the extraction service are replaced by scripted
//! fakes, so these tests need neither pdfium nor an API key. Each scripted
//! response is raw service text and goes through the same parser as a real
//! response.
//!
//! Run with:
//!   cargo test --test pipeline

use async_trait::async_trait;
use edgequake_bankstmt::pipeline::parse::parse_response;
use edgequake_bankstmt::{
    ExtractionClient, ExtractionConfig, ExtractionUnit, ImagePayload, InputFile, PageRasterizer,
    PageResult, RunProgressCallback, RunSnapshot, RunStatus, StatementError, StatementPipeline,
};
use image::{DynamicImage, RgbImage};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

// ── Fakes ────────────────────────────────────────────────────────────────────

/// Page counts by file name; optionally fails to render one page.
#[derive(Default)]
struct FakeRasterizer {
    pages: HashMap<String, usize>,
    fail_on: Option<(String, usize)>,
    rendered: Mutex<Vec<(String, usize, f32)>>,
    /// Status seen by an observer each time a file is counted.
    observer: Mutex<Option<watch::Receiver<RunSnapshot>>>,
    seen: Mutex<Vec<(RunStatus, String)>>,
}

impl FakeRasterizer {
    fn with_pages(pages: &[(&str, usize)]) -> Self {
        Self {
            pages: pages.iter().map(|(n, p)| (n.to_string(), *p)).collect(),
            ..Default::default()
        }
    }

    fn failing_on(mut self, name: &str, page: usize) -> Self {
        self.fail_on = Some((name.to_string(), page));
        self
    }
}

#[async_trait]
impl PageRasterizer for FakeRasterizer {
    async fn page_count(&self, file: &InputFile) -> Result<usize, StatementError> {
        if let Some(rx) = self.observer.lock().unwrap().as_ref() {
            let snap = rx.borrow();
            self.seen
                .lock()
                .unwrap()
                .push((snap.status.clone(), snap.status_line.clone()));
        }
        Ok(self.pages.get(&file.name).copied().unwrap_or(1))
    }

    async fn render_page(
        &self,
        file: &InputFile,
        page_index: usize,
        scale: f32,
    ) -> Result<DynamicImage, StatementError> {
        if let Some((ref name, page)) = self.fail_on {
            if *name == file.name && page == page_index {
                return Err(StatementError::RasterisationFailed {
                    file: file.name.clone(),
                    page_index,
                    detail: "scripted failure".into(),
                });
            }
        }
        self.rendered
            .lock()
            .unwrap()
            .push((file.name.clone(), page_index, scale));
        Ok(DynamicImage::ImageRgb8(RgbImage::new(8, 8)))
    }
}

/// Returns scripted responses in call order. `Err` entries become
/// extraction failures.
#[derive(Default)]
struct ScriptedClient {
    script: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
    mime_types: Mutex<Vec<String>>,
    first_call_delay: Option<Duration>,
    /// Transaction counts visible to an observer at the moment of each call.
    observer: Mutex<Option<watch::Receiver<RunSnapshot>>>,
    observed: Mutex<Vec<usize>>,
}

impl ScriptedClient {
    fn new(script: Vec<Result<String, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    fn ok(responses: &[String]) -> Self {
        Self::new(responses.iter().cloned().map(Ok).collect())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionClient for ScriptedClient {
    async fn extract(&self, payload: ImagePayload) -> Result<PageResult, StatementError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.mime_types.lock().unwrap().push(payload.mime_type);

        if let Some(rx) = self.observer.lock().unwrap().as_ref() {
            self.observed
                .lock()
                .unwrap()
                .push(rx.borrow().transactions.len());
        }

        if call == 0 {
            if let Some(delay) = self.first_call_delay {
                tokio::time::sleep(delay).await;
            }
        }

        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(page(None, None, &[])));
        match next {
            Ok(text) => parse_response(&text),
            Err(reason) => Err(StatementError::ExtractionFailed { reason }),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Service text for one page. Transactions are (description, amount).
fn page(opening: Option<f64>, closing: Option<f64>, txs: &[(&str, f64)]) -> String {
    let transactions: Vec<serde_json::Value> = txs
        .iter()
        .map(|(description, amount)| {
            serde_json::json!({
                "date": "01-04-2024",
                "description": description,
                "amount": amount,
                "category": "Other",
            })
        })
        .collect();
    serde_json::json!({
        "openingBalance": opening,
        "closingBalance": closing,
        "transactions": transactions,
    })
    .to_string()
}

fn pdf(name: &str) -> InputFile {
    InputFile::from_bytes(name, "application/pdf", b"%PDF-1.7".to_vec())
}

fn png(name: &str) -> InputFile {
    InputFile::from_bytes(name, "image/png", vec![0x89, b'P', b'N', b'G'])
}

fn text(name: &str) -> InputFile {
    InputFile::from_bytes(name, "text/plain", b"not a statement".to_vec())
}

fn pipeline(rasterizer: FakeRasterizer, client: Arc<ScriptedClient>) -> StatementPipeline {
    StatementPipeline::new(&ExtractionConfig::default(), Arc::new(rasterizer), client)
}

fn descriptions(snapshot_or_report: &[edgequake_bankstmt::Transaction]) -> Vec<&str> {
    snapshot_or_report
        .iter()
        .map(|t| t.description.as_str())
        .collect()
}

// ── Decomposition ────────────────────────────────────────────────────────────

#[tokio::test]
async fn one_unit_per_page_and_per_image_in_order() {
    let rasterizer = FakeRasterizer::with_pages(&[("april.pdf", 3)]);
    let client = Arc::new(ScriptedClient::ok(&[
        page(None, None, &[("p1", 1.0)]),
        page(None, None, &[("p2", 2.0)]),
        page(None, None, &[("p3", 3.0)]),
        page(None, None, &[("img", 4.0)]),
    ]));
    let mut pipe = StatementPipeline::new(
        &ExtractionConfig::default(),
        Arc::new(rasterizer),
        client.clone(),
    );

    let report = pipe.run(&[pdf("april.pdf"), png("scan.png")]).await.unwrap();

    assert_eq!(client.calls(), 4);
    assert_eq!(report.stats.total_units, 4);
    assert_eq!(descriptions(&report.transactions), vec!["p1", "p2", "p3", "img"]);
    assert_eq!(
        *client.mime_types.lock().unwrap(),
        vec!["image/jpeg", "image/jpeg", "image/jpeg", "image/png"]
    );
}

#[tokio::test]
async fn pages_rendered_at_double_scale_in_ascending_order() {
    let rasterizer = Arc::new(FakeRasterizer::with_pages(&[("a.pdf", 2), ("b.pdf", 1)]));
    let client = Arc::new(ScriptedClient::ok(&[]));
    let mut pipe = StatementPipeline::new(
        &ExtractionConfig::default(),
        rasterizer.clone(),
        client,
    );

    pipe.run(&[pdf("a.pdf"), pdf("b.pdf")]).await.unwrap();

    let rendered = rasterizer.rendered.lock().unwrap().clone();
    assert_eq!(
        rendered,
        vec![
            ("a.pdf".to_string(), 0, 2.0),
            ("a.pdf".to_string(), 1, 2.0),
            ("b.pdf".to_string(), 0, 2.0),
        ]
    );
}

// ── Balances ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn opening_balance_comes_only_from_first_unit() {
    let rasterizer = FakeRasterizer::with_pages(&[("a.pdf", 2), ("b.pdf", 1)]);
    let client = Arc::new(ScriptedClient::ok(&[
        page(None, None, &[]),
        page(Some(100.0), None, &[]),
        page(Some(999.0), None, &[]),
    ]));
    let mut pipe = pipeline(rasterizer, client);

    let report = pipe.run(&[pdf("a.pdf"), pdf("b.pdf")]).await.unwrap();
    assert_eq!(report.balances.opening_balance, None);
}

#[tokio::test]
async fn opening_balance_from_first_page() {
    let client = Arc::new(ScriptedClient::ok(&[
        page(Some(2500.0), None, &[]),
        page(Some(999.0), None, &[]),
    ]));
    let mut pipe = pipeline(FakeRasterizer::default(), client);

    let report = pipe.run(&[png("a.png"), png("b.png")]).await.unwrap();
    assert_eq!(report.balances.opening_balance, Some(2500.0));
}

#[tokio::test]
async fn closing_balance_is_last_non_null() {
    let rasterizer = FakeRasterizer::with_pages(&[("a.pdf", 3)]);
    let client = Arc::new(ScriptedClient::ok(&[
        page(None, None, &[]),
        page(None, Some(500.0), &[]),
        page(None, None, &[]),
    ]));
    let mut pipe = pipeline(rasterizer, client);

    let report = pipe.run(&[pdf("a.pdf")]).await.unwrap();
    assert_eq!(report.balances.closing_balance, Some(500.0));
}

#[tokio::test]
async fn totals_sum_signed_amounts() {
    let client = Arc::new(ScriptedClient::ok(&[page(
        Some(1000.0),
        Some(1350.0),
        &[("Salary", 500.0), ("Rent", -120.0), ("Coffee", -30.0)],
    )]));
    let mut pipe = pipeline(FakeRasterizer::default(), client);

    let report = pipe.run(&[png("june.png")]).await.unwrap();
    assert_eq!(report.balances.total_credits, 500.0);
    assert_eq!(report.balances.total_debits, -150.0);
}

#[tokio::test]
async fn empty_batch_has_zero_totals() {
    let client = Arc::new(ScriptedClient::ok(&[]));
    let mut pipe = pipeline(FakeRasterizer::default(), client.clone());

    let report = pipe.run(&[]).await.unwrap();
    assert_eq!(client.calls(), 0);
    assert!(report.transactions.is_empty());
    assert_eq!(report.balances.total_credits, 0.0);
    assert_eq!(report.balances.total_debits, 0.0);
}

// ── Validation ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn transaction_missing_category_is_dropped() {
    let response = r#"{
        "openingBalance": null,
        "closingBalance": null,
        "transactions": [
            {"date": "01-04-2024", "description": "Rent", "amount": -900, "category": "Housing"},
            {"date": "02-04-2024", "description": "Mystery", "amount": -5},
            {"date": "03-04-2024", "description": "Refund", "amount": 40, "category": "Shopping"}
        ]
    }"#;
    let client = Arc::new(ScriptedClient::ok(&[response.to_string()]));
    let mut pipe = pipeline(FakeRasterizer::default(), client);

    let report = pipe.run(&[png("april.png")]).await.unwrap();
    assert_eq!(descriptions(&report.transactions), vec!["Rent", "Refund"]);
}

#[tokio::test]
async fn fenced_wrong_shape_response_is_an_empty_page() {
    let client = Arc::new(ScriptedClient::ok(&[
        "```json\n{\"rows\": []}\n```".to_string(),
        page(None, Some(75.0), &[("Later", 1.0)]),
    ]));
    let mut pipe = pipeline(FakeRasterizer::default(), client);

    let report = pipe.run(&[png("a.png"), png("b.png")]).await.unwrap();
    assert_eq!(descriptions(&report.transactions), vec!["Later"]);
    assert_eq!(report.balances.closing_balance, Some(75.0));
}

// ── Ordering ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn results_keep_file_order_when_first_call_is_slow() {
    let client = Arc::new(ScriptedClient {
        first_call_delay: Some(Duration::from_millis(50)),
        ..ScriptedClient::ok(&[page(None, None, &[("T1", 1.0)]), page(None, None, &[("T2", 2.0)])])
    });
    let mut pipe = pipeline(FakeRasterizer::default(), client);

    let report = pipe.run(&[png("one.png"), png("two.png")]).await.unwrap();
    assert_eq!(descriptions(&report.transactions), vec!["T1", "T2"]);
}

#[tokio::test]
async fn snapshot_is_republished_before_next_unit() {
    let rasterizer = FakeRasterizer::with_pages(&[("a.pdf", 3)]);
    let client = Arc::new(ScriptedClient::ok(&[
        page(None, None, &[("a", 1.0), ("b", 2.0)]),
        page(None, None, &[("c", 3.0)]),
        page(None, None, &[]),
    ]));
    let mut pipe = StatementPipeline::new(
        &ExtractionConfig::default(),
        Arc::new(rasterizer),
        client.clone(),
    );
    *client.observer.lock().unwrap() = Some(pipe.subscribe());

    pipe.run(&[pdf("a.pdf")]).await.unwrap();

    assert_eq!(*client.observed.lock().unwrap(), vec![0, 2, 3]);
}

#[tokio::test]
async fn file_label_is_published_before_file_is_decomposed() {
    let rasterizer = Arc::new(FakeRasterizer::with_pages(&[("a.pdf", 1), ("b.pdf", 2)]));
    let client = Arc::new(ScriptedClient::default());
    let mut pipe = StatementPipeline::new(
        &ExtractionConfig::default(),
        rasterizer.clone(),
        client,
    );
    *rasterizer.observer.lock().unwrap() = Some(pipe.subscribe());

    pipe.run(&[pdf("a.pdf"), pdf("b.pdf")]).await.unwrap();

    let first = "Processing file 1 of 2: a.pdf".to_string();
    let second = "Processing file 2 of 2: b.pdf".to_string();
    assert_eq!(
        *rasterizer.seen.lock().unwrap(),
        vec![
            (RunStatus::Running(first.clone()), first),
            (RunStatus::Running(second.clone()), second),
        ]
    );
}

// ── Run status ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn success_sets_status_line_and_summary() {
    let rasterizer = FakeRasterizer::with_pages(&[("a.pdf", 2)]);
    let client = Arc::new(ScriptedClient::ok(&[
        page(Some(10.0), None, &[("x", 1.0), ("y", -1.0)]),
        page(None, Some(10.0), &[("z", 5.0)]),
    ]));
    let mut pipe = pipeline(rasterizer, client);
    assert_eq!(pipe.snapshot().status, RunStatus::Idle);

    pipe.run(&[pdf("a.pdf"), png("b.png")]).await.unwrap();

    let snap = pipe.snapshot();
    let expected = "Successfully processed 2 file(s) and extracted 3 transactions.";
    assert_eq!(snap.status, RunStatus::Succeeded(expected.to_string()));
    assert_eq!(snap.status_line, expected);
    assert_eq!(snap.error, None);
    assert_eq!(snap.units_processed, 3);
    let summary = snap.summary.expect("summary after success");
    assert_eq!(summary.opening_balance, Some(10.0));
    assert_eq!(summary.total_credits, 6.0);
}

#[tokio::test]
async fn unsupported_file_mid_batch_keeps_earlier_results() {
    let client = Arc::new(ScriptedClient::ok(&[
        page(Some(50.0), Some(60.0), &[("from A", 10.0)]),
        page(None, None, &[("from C", 1.0)]),
    ]));
    let mut pipe = pipeline(FakeRasterizer::default(), client.clone());

    let err = pipe
        .run(&[png("a.png"), text("notes.txt"), png("c.png")])
        .await
        .unwrap_err();

    assert!(matches!(err, StatementError::UnsupportedInputKind { ref file } if file == "notes.txt"));
    assert_eq!(client.calls(), 1);

    let snap = pipe.snapshot();
    assert!(matches!(snap.status, RunStatus::Failed(_)));
    assert_eq!(snap.status_line, "Processing failed.");
    assert_eq!(
        snap.error.as_deref(),
        Some("Unsupported file type: notes.txt. Please upload PDF or image files.")
    );
    assert_eq!(descriptions(&snap.transactions), vec!["from A"]);
    assert_eq!(snap.opening_balance, Some(50.0));
    assert_eq!(snap.closing_balance, Some(60.0));
    assert!(snap.summary.is_none());
}

#[tokio::test]
async fn rasterisation_failure_is_fatal() {
    let rasterizer = FakeRasterizer::with_pages(&[("a.pdf", 3)]).failing_on("a.pdf", 1);
    let client = Arc::new(ScriptedClient::ok(&[page(None, None, &[("first", 1.0)])]));
    let mut pipe = pipeline(rasterizer, client.clone());

    let err = pipe.run(&[pdf("a.pdf")]).await.unwrap_err();

    assert!(matches!(
        err,
        StatementError::RasterisationFailed { page_index: 1, .. }
    ));
    assert_eq!(client.calls(), 1);
    let snap = pipe.snapshot();
    assert!(matches!(snap.status, RunStatus::Failed(_)));
    assert_eq!(descriptions(&snap.transactions), vec!["first"]);
}

#[tokio::test]
async fn extraction_failure_is_fatal_without_retry() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(page(None, None, &[("ok", 1.0)])),
        Err("503 Service Unavailable".to_string()),
        Ok(page(None, None, &[("never", 1.0)])),
    ]));
    let mut pipe = pipeline(FakeRasterizer::default(), client.clone());

    let err = pipe
        .run(&[png("a.png"), png("b.png"), png("c.png")])
        .await
        .unwrap_err();

    assert!(matches!(err, StatementError::ExtractionFailed { .. }));
    assert_eq!(client.calls(), 2);
    let snap = pipe.snapshot();
    assert_eq!(
        snap.error.as_deref(),
        Some("Failed to extract transactions: 503 Service Unavailable")
    );
    assert_eq!(descriptions(&snap.transactions), vec!["ok"]);
}

#[tokio::test]
async fn failed_run_hands_back_partial_report() {
    let client = Arc::new(ScriptedClient::new(vec![
        Ok(page(Some(100.0), None, &[("salary", 500.0), ("rent", -300.0)])),
        Ok(page(None, Some(290.0), &[("coffee", -10.0)])),
        Err("quota exceeded".to_string()),
    ]));
    let rasterizer = FakeRasterizer::with_pages(&[("a.pdf", 2)]);
    let mut pipe = pipeline(rasterizer, client);

    let failed = pipe
        .run_keeping_partial(&[pdf("a.pdf"), png("b.png")])
        .await
        .unwrap_err();

    assert!(matches!(failed.error, StatementError::ExtractionFailed { .. }));
    assert_eq!(
        failed.to_string(),
        "Failed to extract transactions: quota exceeded"
    );
    let partial = &failed.partial;
    assert_eq!(descriptions(&partial.transactions), vec!["salary", "rent", "coffee"]);
    assert_eq!(partial.balances.opening_balance, Some(100.0));
    assert_eq!(partial.balances.closing_balance, Some(290.0));
    assert_eq!(partial.balances.total_credits, 500.0);
    assert_eq!(partial.balances.total_debits, -310.0);
    assert_eq!(partial.stats.total_files, 2);
    assert_eq!(partial.stats.total_units, 2);
    assert_eq!(partial.stats.total_transactions, 3);
    assert!(matches!(pipe.snapshot().status, RunStatus::Failed(_)));
}

#[tokio::test]
async fn successful_run_keeping_partial_returns_full_report() {
    let client = Arc::new(ScriptedClient::ok(&[page(None, Some(5.0), &[("only", 5.0)])]));
    let mut pipe = pipeline(FakeRasterizer::default(), client);

    let report = pipe.run_keeping_partial(&[png("a.png")]).await.unwrap();

    assert_eq!(descriptions(&report.transactions), vec!["only"]);
    assert_eq!(report.balances.closing_balance, Some(5.0));
    assert_eq!(report.stats.total_units, 1);
}

#[tokio::test]
async fn non_json_response_fails_the_run() {
    let client = Arc::new(ScriptedClient::ok(&["Sorry, I cannot read this.".to_string()]));
    let mut pipe = pipeline(FakeRasterizer::default(), client);

    let err = pipe.run(&[png("blurry.png")]).await.unwrap_err();
    assert!(matches!(err, StatementError::ExtractionFailed { .. }));
}

#[tokio::test]
async fn new_run_resets_state() {
    let client = Arc::new(ScriptedClient::ok(&[
        page(Some(1.0), Some(2.0), &[("old", 1.0)]),
        page(None, None, &[("new", 3.0)]),
    ]));
    let mut pipe = pipeline(FakeRasterizer::default(), client);

    pipe.run(&[png("first.png")]).await.unwrap();
    let report = pipe.run(&[png("second.png")]).await.unwrap();

    assert_eq!(descriptions(&report.transactions), vec!["new"]);
    assert_eq!(report.balances.opening_balance, None);
    assert_eq!(report.balances.closing_balance, None);
    assert_eq!(pipe.snapshot().units_processed, 1);
}

// ── Progress callbacks ───────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingCallback {
    events: Mutex<Vec<String>>,
}

impl RunProgressCallback for RecordingCallback {
    fn on_run_start(&self, total_files: usize) {
        self.events.lock().unwrap().push(format!("start {total_files}"));
    }

    fn on_file_start(&self, file_index: usize, _total_files: usize, file_name: &str) {
        self.events
            .lock()
            .unwrap()
            .push(format!("file {file_index} {file_name}"));
    }

    fn on_unit_start(&self, _unit: &ExtractionUnit, label: &str) {
        self.events.lock().unwrap().push(label.to_string());
    }

    fn on_unit_complete(&self, unit: &ExtractionUnit, transactions_found: usize) {
        self.events.lock().unwrap().push(format!(
            "done {}/{} {}",
            unit.source_file_index, unit.source_page_index, transactions_found
        ));
    }

    fn on_run_complete(&self, total_files: usize, total_transactions: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("complete {total_files} {total_transactions}"));
    }

    fn on_run_failed(&self, error: &str) {
        self.events.lock().unwrap().push(format!("failed {error}"));
    }
}

#[tokio::test]
async fn progress_events_follow_units() {
    let recorder = Arc::new(RecordingCallback::default());
    let config = ExtractionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let client = Arc::new(ScriptedClient::ok(&[
        page(None, None, &[("a", 1.0)]),
        page(None, None, &[]),
        page(None, None, &[("b", 1.0), ("c", 1.0)]),
    ]));
    let mut pipe = StatementPipeline::new(
        &config,
        Arc::new(FakeRasterizer::with_pages(&[("stmt.pdf", 2)])),
        client,
    );

    pipe.run(&[pdf("stmt.pdf"), png("photo.png")]).await.unwrap();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events,
        vec![
            "start 2",
            "file 0 stmt.pdf",
            "Processing page 1 of 2 (File 1/2)",
            "done 0/0 1",
            "Processing page 2 of 2 (File 1/2)",
            "done 0/1 0",
            "file 1 photo.png",
            "Processing image: photo.png",
            "done 1/0 2",
            "complete 2 3",
        ]
    );
}

#[tokio::test]
async fn progress_reports_failure() {
    let recorder = Arc::new(RecordingCallback::default());
    let config = ExtractionConfig::builder()
        .progress_callback(recorder.clone())
        .build()
        .unwrap();
    let mut pipe = StatementPipeline::new(
        &config,
        Arc::new(FakeRasterizer::default()),
        Arc::new(ScriptedClient::ok(&[])),
    );

    pipe.run(&[text("readme.txt")]).await.unwrap_err();

    let events = recorder.events.lock().unwrap().clone();
    assert_eq!(
        events.last().map(String::as_str),
        Some("failed Unsupported file type: readme.txt. Please upload PDF or image files.")
    );
}

// ── Streaming ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn snapshot_stream_ends_with_terminal_state() {
    use futures::StreamExt;

    let client = Arc::new(ScriptedClient::ok(&[page(None, Some(42.0), &[("x", 1.0)])]));
    let mut pipe = pipeline(FakeRasterizer::default(), client);
    let mut snapshots = pipe.snapshots();

    let files = vec![png("only.png")];
    let run = tokio::spawn(async move {
        let result = pipe.run(&files).await;
        drop(pipe);
        result
    });

    let mut last = None;
    while let Some(snap) = snapshots.next().await {
        last = Some(snap);
    }
    run.await.unwrap().unwrap();

    let last = last.unwrap();
    assert!(last.status.is_terminal());
    assert_eq!(last.closing_balance, Some(42.0));
    assert_eq!(last.transactions.len(), 1);
}
