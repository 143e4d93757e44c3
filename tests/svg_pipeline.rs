use std::sync::Arc;

use cardimg::backend::svg::{RasterSettings, load_font_db};
use cardimg::engine::options::{IMAGE_FORMAT, MAX_WIDTH};
use cardimg::engine::theme::{FixedClock, FixedIndex, ThemeSelector};
use cardimg::{
    FallbackOptions, RenderOptions, RenderRequest, RenderService, SvgBackend, TemplateRegistry,
};

const SIMPLE_LAYOUT: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="600" height="200">
  <rect width="600" height="200" fill="{{ bg_color }}"/>
  <text x="20" y="40" fill="{{ text_color }}">{{ title }}</text>
</svg>"##;

const BILI_LAYOUT: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="1080" height="2400">
  <rect width="1080" height="2400" fill="#101010"/>
  <text x="40" y="80" fill="#ffffff">{{ content }}</text>
</svg>"##;

fn service(root: &std::path::Path) -> RenderService {
    for (id, files, body) in [
        ("simple", &["template.html"][..], SIMPLE_LAYOUT),
        ("bili", &["day.html", "night.html"][..], BILI_LAYOUT),
    ] {
        let dir = root.join(id);
        std::fs::create_dir_all(&dir).expect("mkdir");
        for f in files {
            std::fs::write(dir.join(f), body).expect("write layout");
        }
    }

    let registry = Arc::new(TemplateRegistry::new(root));
    registry.initialize().expect("init");
    let backend = Arc::new(SvgBackend::new(
        load_font_db(None, false),
        RasterSettings::default(),
        8,
    ));
    RenderService::new(registry, backend, Arc::new(FallbackOptions::default())).with_theme(
        ThemeSelector::new(Arc::new(FixedClock(9)), Arc::new(FixedIndex(0))),
    )
}

#[tokio::test]
async fn simple_template_renders_png_at_layout_size() {
    let root = tempfile::tempdir().expect("tempdir");
    let service = service(root.path());

    let bytes = service
        .render("simple", &RenderRequest::new().title("<标题 & 内容>"))
        .await
        .expect("render");

    let img = image::load_from_memory(&bytes).expect("decode png");
    assert_eq!((img.width(), img.height()), (600, 200));
    // 白天配色：白底
    let px = img.to_rgba8().get_pixel(590, 190).0;
    assert_eq!(px, [255, 255, 255, 255]);
}

#[tokio::test]
async fn per_call_width_and_format_reach_rasterizer() {
    let root = tempfile::tempdir().expect("tempdir");
    let service = service(root.path());

    let request = RenderRequest::new()
        .night_mode(true)
        .options(RenderOptions::new().with(MAX_WIDTH, 300).with(IMAGE_FORMAT, "jpeg"));
    let bytes = service.render("simple", &request).await.expect("render");

    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
    let img = image::load_from_memory(&bytes).expect("decode jpeg");
    assert_eq!((img.width(), img.height()), (300, 100));
}

#[tokio::test]
async fn fixed_viewport_template_uses_device_height() {
    let root = tempfile::tempdir().expect("tempdir");
    let service = service(root.path());

    let bytes = service
        .render("bili", &RenderRequest::new().content("hello"))
        .await
        .expect("render");
    let img = image::load_from_memory(&bytes).expect("decode png");
    assert_eq!((img.width(), img.height()), (540, 960));
}

#[tokio::test]
async fn text_and_markdown_sources_render() {
    let root = tempfile::tempdir().expect("tempdir");
    let service = service(root.path());

    let text = service
        .render_text("第一行\n第二行", None)
        .await
        .expect("text");
    let img = image::load_from_memory(&text).expect("decode");
    assert_eq!(img.width(), 800);

    let md = service
        .render_markdown("# 标题\n\n- a\n- b", Some(&RenderOptions::new().with(MAX_WIDTH, 400)))
        .await
        .expect("markdown");
    let img = image::load_from_memory(&md).expect("decode");
    assert_eq!(img.width(), 400);
}

#[test]
fn bundled_simple_layout_is_single_file() {
    let simple = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/templates/simple");
    assert!(simple.join("template.html").is_file());
    assert!(!simple.join("day.html").exists());
    assert!(!simple.join("night.html").exists());
}

#[tokio::test]
async fn bundled_layouts_render_for_every_template() {
    let templates = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("resources/templates");
    let registry = Arc::new(TemplateRegistry::new(templates));
    registry.initialize().expect("init");
    let backend = Arc::new(SvgBackend::new(
        load_font_db(None, false),
        RasterSettings::default(),
        8,
    ));
    let service = RenderService::new(registry, backend, Arc::new(FallbackOptions::default()));

    let request = RenderRequest::new()
        .title("标题")
        .content("正文内容")
        .footer("页脚")
        .tip("提示")
        .items([("查询", "/q <名称>"), ("帮助", "/help")])
        .columns(["名称", "值"])
        .data([vec!["a", "1"], vec!["b", "2"], vec!["c", "3"]]);

    for id in service.list_template_ids() {
        for night in [false, true] {
            let bytes = service
                .render(&id, &request.clone().night_mode(night))
                .await
                .unwrap_or_else(|e| panic!("{id} (night={night}) failed: {e}"));
            assert!(bytes.starts_with(b"\x89PNG"), "{id} did not produce png");
        }
    }
}
