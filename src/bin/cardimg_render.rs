//! 命令行一次性渲染工具：按模板 ID 渲染卡片图片并写入文件。
//!
//! 示例：`cardimg-render --template bili --content "你好" --footer "-- 2024" --night --out bili.png`

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use cardimg::engine::options::IMAGE_FORMAT;
use cardimg::startup::load_templates;
use cardimg::{
    CardImgConfig, ImageFormat, NightMode, RenderOptions, RenderRequest, RenderService,
    SvgBackend, TemplateKind, TemplateRegistry,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse(std::env::args().skip(1).collect());
    if args.help {
        print_help();
        return Ok(());
    }

    let config = CardImgConfig::load()?;

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("cardimg={}", config.logging.level))
    });
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let registry = Arc::new(TemplateRegistry::new(config.templates_path()));
    if !load_templates(&registry) {
        return Err("模板库加载失败".into());
    }

    if args.list {
        for id in registry.list_ids() {
            let name = TemplateKind::from_id(&id)
                .map(|k| k.display_name())
                .unwrap_or_default();
            println!("{id}\t{name}");
        }
        return Ok(());
    }

    let template_id = args
        .template
        .clone()
        .ok_or("缺少 --template（使用 --list 查看可用模板）")?;

    let backend = Arc::new(SvgBackend::from_config(&config));
    let service = RenderService::new(registry, backend, Arc::new(config));

    let format = match args.format.as_deref() {
        Some(v) => Some(v.parse::<ImageFormat>()?),
        None => None,
    };

    let mut request = RenderRequest::new()
        .title(args.title)
        .content(args.content)
        .footer(args.footer)
        .tip(args.tip)
        .night_mode(args.night)
        .items(args.items);
    if !args.columns.is_empty() {
        request = request.columns(args.columns);
    }
    if !args.rows.is_empty() {
        request = request.data(args.rows);
    }
    if let Some(fmt) = format {
        request = request.options(RenderOptions::new().with(IMAGE_FORMAT, fmt.as_str()));
    }

    let bytes = service.render(&template_id, &request).await?;

    let out_path = args.out_path.unwrap_or_else(|| {
        let ext = if bytes.starts_with(&[0xFF, 0xD8]) { "jpg" } else { "png" };
        PathBuf::from(format!("{template_id}.{ext}"))
    });
    fs::write(&out_path, &bytes)?;
    println!("已写入: {} ({} 字节)", out_path.display(), bytes.len());

    Ok(())
}

#[derive(Debug, Clone, Default)]
struct Args {
    help: bool,
    list: bool,
    template: Option<String>,
    title: String,
    content: String,
    footer: String,
    tip: String,
    night: NightMode,
    items: Vec<(String, String)>,
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
    format: Option<String>,
    out_path: Option<PathBuf>,
}

impl Args {
    fn parse(argv: Vec<String>) -> Self {
        let mut args = Self::default();

        let mut it = argv.into_iter();
        while let Some(a) = it.next() {
            match a.as_str() {
                "-h" | "--help" => args.help = true,
                "--list" => args.list = true,
                "--template" | "-t" => args.template = it.next(),
                "--title" => args.title = it.next().unwrap_or_default(),
                "--content" => args.content = it.next().unwrap_or_default(),
                "--footer" => args.footer = it.next().unwrap_or_default(),
                "--tip" => args.tip = it.next().unwrap_or_default(),
                "--night" => args.night = NightMode::Night,
                "--day" => args.night = NightMode::Day,
                "--item" => {
                    if let Some(v) = it.next() {
                        let (k, v) = v.split_once('=').unwrap_or((v.as_str(), ""));
                        args.items.push((k.to_string(), v.to_string()));
                    }
                }
                "--columns" => {
                    if let Some(v) = it.next() {
                        args.columns = split_cells(&v);
                    }
                }
                "--row" => {
                    if let Some(v) = it.next() {
                        args.rows.push(split_cells(&v));
                    }
                }
                "--format" => args.format = it.next(),
                "--out" | "-o" => {
                    if let Some(v) = it.next() {
                        args.out_path = Some(PathBuf::from(v));
                    }
                }
                _ => {
                    eprintln!("忽略未知参数: {a}");
                }
            }
        }

        args
    }
}

fn split_cells(v: &str) -> Vec<String> {
    v.split(',').map(|s| s.trim().to_string()).collect()
}

fn print_help() {
    println!(
        r#"cardimg-render

用法:
  cargo run --bin cardimg-render -- --template <id> [options]

选项:
  --list                 列出可用模板
  -t, --template <id>    模板 ID
  --title <text>         标题
  --content <text>       正文
  --footer <text>        页脚
  --tip <text>           表格提示
  --night | --day        强制夜间 / 白天（缺省按时间自动判断）
  --item <k=v>           帮助条目（可重复）
  --columns <a,b,..>     表头
  --row <a,b,..>         表格数据行（可重复）
  --format <png|jpeg>    输出格式
  -o, --out <path>       输出文件（默认 <id>.<ext>）

配置:
  cardimg.toml（可用环境变量 CARDIMG_CONFIG 指定路径），日志级别可用 RUST_LOG 覆盖
"#
    );
}
