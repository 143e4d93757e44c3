use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use cardimg::config::{CardImgConfig, SharedConfig};
use cardimg::engine::options::{IMAGE_FORMAT, JPEG_QUALITY, MAX_WIDTH};
use cardimg::engine::theme::{FixedClock, FixedIndex, ThemeSelector};
use cardimg::{
    CardImgError, FallbackOptions, ImageFormat, RenderBackend, RenderOptions, RenderRequest,
    RenderService, TemplatePayload, TemplateRegistry,
};

const IMAGE_BYTES: &[u8] = b"\x89PNG fake image";

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Layout {
        directory: PathBuf,
        layout: String,
        payload: TemplatePayload,
        options: RenderOptions,
    },
    Html(String, RenderOptions),
    Markdown(String, RenderOptions),
    Text(String, RenderOptions),
}

/// 记录每次调用并返回固定字节
#[derive(Default)]
struct RecordingBackend {
    calls: Mutex<Vec<Call>>,
    fail_with: Option<String>,
}

impl RecordingBackend {
    fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(msg.to_string()),
            ..Self::default()
        }
    }

    fn record(&self, call: Call) -> Result<Vec<u8>, CardImgError> {
        self.calls.lock().expect("lock").push(call);
        match &self.fail_with {
            Some(msg) => Err(CardImgError::Backend(msg.clone())),
            None => Ok(IMAGE_BYTES.to_vec()),
        }
    }

    fn last(&self) -> Call {
        self.calls
            .lock()
            .expect("lock")
            .last()
            .cloned()
            .expect("backend was not called")
    }

    fn count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

#[async_trait]
impl RenderBackend for RecordingBackend {
    async fn render_named_layout(
        &self,
        directory: &Path,
        layout_name: &str,
        payload: &TemplatePayload,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        self.record(Call::Layout {
            directory: directory.to_path_buf(),
            layout: layout_name.to_string(),
            payload: payload.clone(),
            options: options.clone(),
        })
    }

    async fn render_raw_html(
        &self,
        html: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        self.record(Call::Html(html.to_string(), options.clone()))
    }

    async fn render_markdown(
        &self,
        markdown: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        self.record(Call::Markdown(markdown.to_string(), options.clone()))
    }

    async fn render_plain_text(
        &self,
        text: &str,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, CardImgError> {
        self.record(Call::Text(text.to_string(), options.clone()))
    }
}

/// 每个模板目录都放好布局文件（bili 额外放背景图）
fn template_tree() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    for id in ["minote", "simple", "ncm_zhusha", "ncm_card", "bili", "help", "table"] {
        let tpl_dir = dir.path().join(id);
        std::fs::create_dir_all(&tpl_dir).expect("mkdir");
        for layout in ["template.html", "day.html", "night.html"] {
            std::fs::write(tpl_dir.join(layout), "<svg/>").expect("write layout");
        }
    }
    std::fs::write(dir.path().join("bili/bili_dark.jpg"), b"jpg").expect("write bg");
    std::fs::write(dir.path().join("bili/bili_light.jpg"), b"jpg").expect("write bg");
    dir
}

fn service_with(
    root: &Path,
    backend: Arc<RecordingBackend>,
    fallback: Arc<dyn cardimg::FallbackSource>,
    hour: u32,
) -> RenderService {
    let registry = Arc::new(TemplateRegistry::new(root));
    registry.initialize().expect("init");
    RenderService::new(registry, backend, fallback).with_theme(ThemeSelector::new(
        Arc::new(FixedClock(hour)),
        Arc::new(FixedIndex(0)),
    ))
}

fn layout_call(call: Call) -> (PathBuf, String, TemplatePayload, RenderOptions) {
    match call {
        Call::Layout {
            directory,
            layout,
            payload,
            options,
        } => (directory, layout, payload, options),
        other => panic!("expected layout call, got {other:?}"),
    }
}

#[tokio::test]
async fn bili_explicit_night_ignores_clock() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    // 中午，但显式指定夜间
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        12,
    );

    let request = RenderRequest::new().content("c").footer("f").night_mode(true);
    let bytes = service.render("bili", &request).await.expect("render");
    assert_eq!(bytes, IMAGE_BYTES);

    let (directory, layout, payload, options) = layout_call(backend.last());
    assert_eq!(directory, root.path().join("bili"));
    assert_eq!(layout, "night.html");
    let bg = payload["bg_image"].as_str().expect("bg_image");
    assert!(bg.ends_with("bili_dark.jpg"), "{bg}");
    assert!(Path::new(bg).is_absolute());
    assert_eq!(payload["content"], "c");
    assert_eq!(payload["footer"], "f");
    assert_eq!(options.max_width(), Some(540));
    assert_eq!(options.device_height(), Some(960));
    assert!(!options.allow_refit());
}

#[tokio::test]
async fn bili_auto_follows_clock() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let fallback = Arc::new(FallbackOptions::default());

    let night = service_with(root.path(), backend.clone(), fallback.clone(), 19);
    night.render("bili", &RenderRequest::new()).await.expect("render");
    assert_eq!(layout_call(backend.last()).1, "night.html");

    let day = service_with(root.path(), backend.clone(), fallback, 10);
    day.render("bili", &RenderRequest::new()).await.expect("render");
    let (_, layout, payload, _) = layout_call(backend.last());
    assert_eq!(layout, "day.html");
    assert!(payload["bg_image"].as_str().unwrap_or_default().ends_with("bili_light.jpg"));
}

#[tokio::test]
async fn table_without_columns_or_data_sends_empty_arrays() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        10,
    );

    service
        .render("table", &RenderRequest::new().title("T").tip("tip"))
        .await
        .expect("render");

    let (_, layout, payload, options) = layout_call(backend.last());
    assert_eq!(layout, "day.html");
    assert_eq!(payload["columns"], json!([]));
    assert_eq!(payload["data"], json!([]));
    assert_eq!(payload["title"], "T");
    assert_eq!(payload["tip"], "tip");
    assert_eq!(payload["header_color"], "#3FE6A0");
    assert_eq!(options.max_width(), Some(1000));
}

#[tokio::test]
async fn table_rows_keep_order() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        10,
    );

    let request = RenderRequest::new()
        .columns(["名称", "值"])
        .data([vec!["a", "1"], vec!["b", "2"]]);
    service.render("table", &request).await.expect("render");

    let (_, _, payload, _) = layout_call(backend.last());
    assert_eq!(payload["columns"], json!(["名称", "值"]));
    assert_eq!(payload["data"], json!([["a", "1"], ["b", "2"]]));
}

#[tokio::test]
async fn help_with_no_items_renders_and_keeps_item_order() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        20,
    );

    service.render("help", &RenderRequest::new()).await.expect("render");
    let (_, layout, payload, _) = layout_call(backend.last());
    assert_eq!(layout, "night.html");
    assert_eq!(payload["items"], json!({}));

    let request = RenderRequest::new().items([("z", "1"), ("a", "2"), ("m", "3")]);
    service.render("help", &request).await.expect("render");
    let (_, _, payload, _) = layout_call(backend.last());
    let keys: Vec<_> = payload["items"]
        .as_object()
        .expect("items object")
        .keys()
        .cloned()
        .collect();
    assert_eq!(keys, ["z", "a", "m"]);
}

#[tokio::test]
async fn unknown_template_is_reported_without_backend_call() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        10,
    );

    let err = service
        .render("wallpaper", &RenderRequest::new())
        .await
        .expect_err("unknown id");
    match err {
        CardImgError::UnknownTemplate { id, available } => {
            assert_eq!(id, "wallpaper");
            assert_eq!(available, service.list_template_ids());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.count(), 0);
}

#[tokio::test]
async fn render_before_initialize_fails() {
    let root = template_tree();
    let registry = Arc::new(TemplateRegistry::new(root.path()));
    let service = RenderService::new(
        registry,
        Arc::new(RecordingBackend::default()),
        Arc::new(FallbackOptions::default()),
    );
    let err = service
        .render("simple", &RenderRequest::new())
        .await
        .expect_err("not initialized");
    assert!(matches!(err, CardImgError::NotInitialized));
}

#[tokio::test]
async fn per_call_options_win_over_defaults() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let fallback = FallbackOptions {
        enabled: true,
        image_format: ImageFormat::Jpeg,
        jpeg_quality: 70,
    };
    let service = service_with(root.path(), backend.clone(), Arc::new(fallback), 10);

    let request = RenderRequest::new()
        .options(RenderOptions::new().with(MAX_WIDTH, 320).with(JPEG_QUALITY, 95));
    service.render("minote", &request).await.expect("render");

    let (_, layout, _, options) = layout_call(backend.last());
    assert_eq!(layout, "template.html");
    assert_eq!(options.max_width(), Some(320));
    assert_eq!(options.jpeg_quality(), 95);
    assert_eq!(options.image_format(), ImageFormat::Jpeg);
    assert!(options.allow_refit());
}

#[tokio::test]
async fn disabled_fallback_contributes_nothing() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let fallback = FallbackOptions {
        enabled: false,
        image_format: ImageFormat::Jpeg,
        jpeg_quality: 70,
    };
    let service = service_with(root.path(), backend.clone(), Arc::new(fallback), 10);

    service.render("simple", &RenderRequest::new()).await.expect("render");
    let (_, _, _, options) = layout_call(backend.last());
    assert!(!options.contains_key(IMAGE_FORMAT));
    assert!(!options.contains_key(JPEG_QUALITY));
    assert_eq!(options.image_format(), ImageFormat::Png);
}

#[tokio::test]
async fn shared_config_edits_apply_to_next_render() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let shared = SharedConfig::new(CardImgConfig::default());
    let service = service_with(root.path(), backend.clone(), Arc::new(shared.clone()), 10);

    service.render("simple", &RenderRequest::new()).await.expect("render");
    assert!(!layout_call(backend.last()).3.contains_key(IMAGE_FORMAT));

    let mut cfg = shared.snapshot();
    cfg.render.use_global_config = true;
    cfg.render.image_format = "jpeg".to_string();
    cfg.render.jpeg_quality = 60;
    shared.replace(cfg).expect("replace");

    service.render("simple", &RenderRequest::new()).await.expect("render");
    let (_, _, _, options) = layout_call(backend.last());
    assert_eq!(options.get(IMAGE_FORMAT), Some(&Value::from("jpeg")));
    assert_eq!(options.jpeg_quality(), 60);
}

#[tokio::test]
async fn simple_uses_single_layout_in_both_modes() {
    let root = template_tree();
    for f in ["day.html", "night.html"] {
        std::fs::remove_file(root.path().join("simple").join(f)).expect("rm layout");
    }
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        10,
    );

    for (night, bg) in [(false, "#ffffff"), (true, "#1a1a1a")] {
        service
            .render("simple", &RenderRequest::new().night_mode(night))
            .await
            .expect("single layout");
        let (_, layout, payload, _) = layout_call(backend.last());
        assert_eq!(layout, "template.html");
        assert_eq!(payload["bg_color"], bg);
    }
}

#[tokio::test]
async fn missing_layout_file_is_fatal() {
    let root = template_tree();
    std::fs::remove_file(root.path().join("table/day.html")).expect("rm layout");
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        10,
    );

    let err = service
        .render("table", &RenderRequest::new().night_mode(false))
        .await
        .expect_err("missing layout");
    match err {
        CardImgError::MissingTemplateFile { path } => {
            assert!(path.ends_with("table/day.html"), "{path:?}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(backend.count(), 0);

    // 夜间布局仍然可用
    service
        .render("table", &RenderRequest::new().night_mode(true))
        .await
        .expect("night layout present");
}

#[tokio::test]
async fn missing_decorative_asset_degrades_to_empty_path() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        10,
    );

    service
        .render("minote", &RenderRequest::new().title("t"))
        .await
        .expect("render");
    let (_, _, payload, _) = layout_call(backend.last());
    assert_eq!(payload["bg_image"], "");
    assert_eq!(payload["banner_01"], "");
    assert_eq!(payload["title"], "t");
}

#[tokio::test]
async fn backend_error_propagates_unchanged() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::failing("renderer crashed"));
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        10,
    );

    let err = service
        .render("ncm_card", &RenderRequest::new())
        .await
        .expect_err("backend failure");
    assert!(matches!(err, CardImgError::Backend(ref msg) if msg == "renderer crashed"));
}

#[tokio::test]
async fn passthrough_sources_use_service_defaults() {
    let root = template_tree();
    let backend = Arc::new(RecordingBackend::default());
    let service = service_with(
        root.path(),
        backend.clone(),
        Arc::new(FallbackOptions::default()),
        10,
    );

    let bytes = service.render_text("hello", None).await.expect("text");
    assert_eq!(bytes, IMAGE_BYTES);
    match backend.last() {
        Call::Text(text, options) => {
            assert_eq!(text, "hello");
            assert_eq!(options.max_width(), Some(800));
        }
        other => panic!("unexpected call: {other:?}"),
    }

    let narrow = RenderOptions::new().with(MAX_WIDTH, 400);
    service
        .render_markdown("# hi", Some(&narrow))
        .await
        .expect("markdown");
    assert!(matches!(
        backend.last(),
        Call::Markdown(ref md, ref o) if md == "# hi" && o.max_width() == Some(400)
    ));

    service
        .render_html("<svg/>", None)
        .await
        .expect("html");
    assert!(matches!(backend.last(), Call::Html(ref h, _) if h == "<svg/>"));
}
