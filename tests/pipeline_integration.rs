use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use toxiscan::classify::{
    normalize_raw, Category, ClassificationError, ClassificationResult, Classifier,
    ClassifyRequest,
};
use toxiscan::page::PageDocument;
use toxiscan::pipeline::{DetectionPipeline, PipelineOptions};
use toxiscan::platform::Platform;
use toxiscan::render::{
    ATTR_CATEGORY, ATTR_MARKER, ATTR_REVEALED, CLASS_OBSCURED, IndicatorRenderer, MARKER_FLAGGED,
    MARKER_SUBTLE, TAG_REVEAL,
};
use toxiscan::settings::PipelineSettings;

/// Plays back canned raw service responses, keyed by comment text, through
/// the same normalization path as the real HTTP client
struct ReplayService {
    responses: HashMap<String, serde_json::Value>,
    calls: AtomicUsize,
}

impl ReplayService {
    fn new(responses: &[(&str, serde_json::Value)]) -> Self {
        Self {
            responses: responses
                .iter()
                .map(|(text, value)| (text.to_string(), value.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl Classifier for ReplayService {
    async fn classify(
        &self,
        request: ClassifyRequest,
    ) -> Result<ClassificationResult, ClassificationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.responses.get(&request.text) {
            Some(raw) => normalize_raw(raw),
            None => Err(ClassificationError::Server {
                status: 404,
                message: format!("no canned response for {:?}", request.text),
            }),
        }
    }
}

const FACEBOOK_SNAPSHOT: &str = r#"{
  "host": "www.facebook.com",
  "body": {
    "tag": "body",
    "children": [
      {
        "tag": "div",
        "classes": ["thread"],
        "children": [
          {
            "tag": "div",
            "attrs": {"data-commentid": "fb-1"},
            "children": [
              {
                "tag": "div",
                "classes": ["comment-body"],
                "text": "Bạn thật là đồ ngu"
              }
            ]
          },
          {
            "tag": "div",
            "attrs": {"data-commentid": "fb-2"},
            "children": [
              {
                "tag": "div",
                "classes": ["comment-body"],
                "text": "Sản phẩm tốt"
              }
            ]
          },
          {
            "tag": "div",
            "attrs": {"data-commentid": "fb-3"},
            "children": [
              {
                "tag": "div",
                "classes": ["comment-body"],
                "text": "ok!"
              }
            ]
          }
        ]
      }
    ]
  }
}"#;

fn load_snapshot() -> PageDocument {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("page.json");
    std::fs::write(&path, FACEBOOK_SNAPSHOT).unwrap();
    PageDocument::load(&path).unwrap()
}

fn authed() -> PipelineSettings {
    PipelineSettings {
        authenticated: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_snapshot_scan_hate_scenario() {
    let doc = load_snapshot();
    let service = ReplayService::new(&[
        ("Bạn thật là đồ ngu", json!({"prediction": 2, "confidence": 0.91})),
        ("Sản phẩm tốt", json!({"prediction_text": "clean", "confidence": 0.97})),
    ]);

    let doc = Arc::new(Mutex::new(doc));
    let mut pipeline =
        DetectionPipeline::new(Arc::clone(&doc), service, PipelineOptions::default());
    assert_eq!(pipeline.platform(), Platform::Facebook);

    let outcomes = pipeline.sweep_once(&authed()).await;

    // The length-3 "ok!" comment never reaches the classifier
    assert_eq!(outcomes.len(), 2);
    assert_eq!(pipeline.classifier().calls.load(Ordering::SeqCst), 2);

    let hate = outcomes
        .iter()
        .find(|(c, _)| c.text == "Bạn thật là đồ ngu")
        .unwrap();
    assert_eq!(hate.0.identity, "native:fb-1");
    let result = hate.1.as_ref().unwrap();
    assert_eq!(result.category, Category::Hate);
    assert!((result.confidence - 0.91).abs() < f32::EPSILON);
    assert!((result.probabilities.hate - 0.91).abs() < f32::EPSILON);

    let doc = doc.lock().unwrap();
    let hate_node = doc
        .descendants(doc.root())
        .into_iter()
        .find(|&id| doc.node(id).unwrap().attr("data-commentid") == Some("fb-1"))
        .unwrap();

    let node = doc.node(hate_node).unwrap();
    assert_eq!(node.attr(ATTR_MARKER), Some(MARKER_FLAGGED));
    assert_eq!(node.attr(ATTR_CATEGORY), Some("hate"));
    assert!(node.has_class(CLASS_OBSCURED));
    assert!(node
        .children()
        .iter()
        .any(|&c| doc.node(c).unwrap().tag == TAG_REVEAL));
}

#[tokio::test]
async fn test_reveal_control_is_single_use() {
    let doc = load_snapshot();
    let service = ReplayService::new(&[
        ("Bạn thật là đồ ngu", json!({"prediction": 2, "confidence": 0.91})),
        ("Sản phẩm tốt", json!({"prediction": 0, "confidence": 0.97})),
    ]);

    let doc = Arc::new(Mutex::new(doc));
    let mut pipeline =
        DetectionPipeline::new(Arc::clone(&doc), service, PipelineOptions::default());
    pipeline.sweep_once(&authed()).await;

    let mut doc = doc.lock().unwrap();
    let hate_node = doc
        .descendants(doc.root())
        .into_iter()
        .find(|&id| doc.node(id).unwrap().has_class(CLASS_OBSCURED))
        .unwrap();

    let renderer = IndicatorRenderer;
    assert!(renderer.reveal(&mut doc, hate_node));
    let node = doc.node(hate_node).unwrap();
    assert!(!node.has_class(CLASS_OBSCURED));
    assert_eq!(node.attr(ATTR_REVEALED), Some("true"));

    // One-way: the second activation changes nothing
    assert!(!renderer.reveal(&mut doc, hate_node));
    assert!(!doc.node(hate_node).unwrap().has_class(CLASS_OBSCURED));
}

#[tokio::test]
async fn test_cache_survives_across_sweeps() {
    let mut page = PageDocument::new("www.facebook.com");
    let root = page.root();
    page.append_child(
        root,
        toxiscan::page::PageNode::new("div")
            .with_attr("data-commentid", "a")
            .with_text("Sản phẩm tốt"),
    )
    .unwrap();

    let service = ReplayService::new(&[(
        "Sản phẩm tốt",
        json!({"prediction": 0, "confidence": 0.97}),
    )]);

    let doc = Arc::new(Mutex::new(page));
    let mut pipeline =
        DetectionPipeline::new(Arc::clone(&doc), service, PipelineOptions::default());
    pipeline.sweep_once(&authed()).await;
    assert_eq!(pipeline.classifier().calls.load(Ordering::SeqCst), 1);

    // Same text shows up later under a different native id
    {
        let mut doc = doc.lock().unwrap();
        let root = doc.root();
        doc.append_child(
            root,
            toxiscan::page::PageNode::new("div")
                .with_attr("data-commentid", "b")
                .with_text("Sản phẩm tốt"),
        )
        .unwrap();
    }

    let outcomes = pipeline.sweep_once(&authed()).await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].1.is_ok());
    // Served from cache: still exactly one network call
    assert_eq!(pipeline.classifier().calls.load(Ordering::SeqCst), 1);

    let doc = doc.lock().unwrap();
    let markers = doc
        .descendants(doc.root())
        .into_iter()
        .filter(|&id| doc.node(id).unwrap().attr(ATTR_MARKER) == Some(MARKER_SUBTLE))
        .count();
    assert_eq!(markers, 2);
}

#[tokio::test]
async fn test_unknown_text_fails_visibly_not_silently() {
    let mut page = PageDocument::new("www.facebook.com");
    let root = page.root();
    let node = page
        .append_child(
            root,
            toxiscan::page::PageNode::new("div")
                .with_attr("data-commentid", "x")
                .with_text("bình luận không có câu trả lời"),
        )
        .unwrap();

    let service = ReplayService::new(&[]);
    let doc = Arc::new(Mutex::new(page));
    let mut pipeline =
        DetectionPipeline::new(Arc::clone(&doc), service, PipelineOptions::default());

    let outcomes = pipeline.sweep_once(&authed()).await;
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].1.is_err());

    // No classification marker is ever fabricated for a failure
    let doc = doc.lock().unwrap();
    assert_eq!(doc.node(node).unwrap().attr(ATTR_MARKER), None);
    assert_eq!(
        doc.node(node).unwrap().attr(toxiscan::render::ATTR_ERROR),
        Some("server")
    );
}
