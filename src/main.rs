use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use epubedit::config::DEFAULT_CONFIG_PATH;
use epubedit::{Book, EditorConfig, EditorError, Result, ViewMode};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

/// 章节列表中预览的字符数
const PREVIEW_CHARS: usize = 40;

/// 📚 epubedit - 用简化标记编辑EPUB章节文本
#[derive(Parser)]
#[command(name = "epubedit")]
#[command(about = "用简化标记语法查看和编辑EPUB章节文本")]
#[command(version)]
struct Args {
    /// 配置文件路径
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 列出书名、作者和全部章节
    Chapters {
        /// EPUB文件路径
        epub: PathBuf,
    },

    /// 以标记文本输出章节或整书
    Show {
        epub: PathBuf,

        /// 章节序号（从1开始）
        #[arg(short, long, conflicts_with = "full")]
        chapter: Option<usize>,

        /// 输出整书视图
        #[arg(long)]
        full: bool,
    },

    /// 把编辑后的标记写回并保存
    Apply {
        epub: PathBuf,

        /// 编辑后的标记文件
        #[arg(short, long)]
        input: PathBuf,

        /// 写回的章节序号（从1开始）
        #[arg(short, long, conflicts_with = "full", required_unless_present = "full")]
        chapter: Option<usize>,

        /// 输入文件是整书视图
        #[arg(long)]
        full: bool,

        /// 另存为；省略时覆盖原文件
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 生成默认配置文件
    InitConfig {
        #[arg(default_value = DEFAULT_CONFIG_PATH)]
        path: PathBuf,
    },
}

fn main() {
    let args = Args::parse();
    let reload_handle = init_tracing(args.verbose);

    let config = EditorConfig::load_or_default(&args.config);
    if !args.verbose && std::env::var_os("RUST_LOG").is_none() {
        set_log_level(&reload_handle, &config.log_level);
    }

    if let Err(err) = run(args.command, &config) {
        error!("{err}");
        eprintln!("❌ 错误: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) -> ReloadHandle {
    let env_filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(filter_layer),
        )
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = match EnvFilter::builder().parse(level) {
        Ok(filter) => filter,
        Err(err) => {
            warn!(%level, "无效的日志级别: {err}");
            return;
        }
    };
    if let Err(err) = handle.modify(|filter| *filter = parsed) {
        warn!(%level, "无法更新日志级别: {err}");
    } else {
        debug!(%level, "已应用配置中的日志级别");
    }
}

fn run(command: Command, config: &EditorConfig) -> Result<()> {
    match command {
        Command::Chapters { epub } => list_chapters(&epub, config),
        Command::Show { epub, chapter, full } => {
            let book = Book::load_with_config(&epub, config)?;
            let full = full || (chapter.is_none() && config.default_view == ViewMode::FullBook);
            let markup = if full {
                book.full_book_markup()?
            } else {
                book.chapter_markup(book.chapter_index(chapter.unwrap_or(1))?)?
            };
            println!("{}", markup);
            Ok(())
        }
        Command::Apply {
            epub,
            input,
            chapter,
            full,
            output,
        } => apply_edit(&epub, &input, chapter, full, output.as_deref(), config),
        Command::InitConfig { path } => {
            EditorConfig::generate_default_config(&path)?;
            println!("✅ 已生成配置文件: {}", path.display());
            Ok(())
        }
    }
}

/// 显示书籍信息和章节列表
fn list_chapters(path: &Path, config: &EditorConfig) -> Result<()> {
    let book = Book::load_with_config(path, config)?;

    println!("📖 书名: {}", book.title());
    println!("✍️  作者: {}", book.author());
    println!("📚 共 {} 章", book.chapters().len());

    for (i, chapter) in book.chapters().iter().enumerate() {
        println!("  {}. {}", i + 1, chapter.title());
        let preview = chapter.preview(PREVIEW_CHARS);
        if !preview.is_empty() {
            println!("     {}", preview);
        }
    }
    Ok(())
}

/// 读取编辑后的标记，写回章节后保存
fn apply_edit(
    path: &Path,
    input: &Path,
    chapter: Option<usize>,
    full: bool,
    output: Option<&Path>,
    config: &EditorConfig,
) -> Result<()> {
    let markup = fs::read_to_string(input).map_err(|source| EditorError::Input {
        path: input.to_path_buf(),
        source,
    })?;
    let mut book = Book::load_with_config(path, config)?;

    if full {
        let commit = book.commit_full_book_edit(&markup)?;
        println!("✅ 已更新 {} 章", commit.updated.len());
        if !commit.unmatched_chapters.is_empty() {
            println!("  ⚠️  没有对应分隔行、保持不变的章节: {}", one_based(&commit.unmatched_chapters));
        }
        if !commit.ignored_delimiters.is_empty() {
            println!("  ⚠️  被忽略的多余分隔行: {}", one_based(&commit.ignored_delimiters));
        }
        if !commit.renamed.is_empty() {
            println!("  💡 分隔行标题与章节标题不一致（已按位置写回）: {}", one_based(&commit.renamed));
        }
    } else {
        let index = book.chapter_index(chapter.unwrap_or(1))?;
        book.commit_chapter_edit(index, &markup)?;
        println!("✅ 已更新章节 {}: {}", index + 1, book.chapter(index)?.title());
    }

    match output {
        Some(output) => book.save(output)?,
        None => book.save_in_place()?,
    }
    let saved = output.unwrap_or(path);
    info!(path = %saved.display(), "已保存");
    println!("💾 已保存到 {}", saved.display());
    Ok(())
}

fn one_based(indices: &[usize]) -> String {
    indices
        .iter()
        .map(|i| (i + 1).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
