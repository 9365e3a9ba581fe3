//! hca - HCA 音频命令行工具
//!
//! 查看头部信息、解码为 WAV、加密/解密数据块、修复校验和.

mod keys;
mod logging;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use hca_core::{HcaError, SampleFormat};
use hca_format::{DecodeOptions, FrameErrorPolicy, HcaInfo};
use tracing::{error, info, warn};

use keys::KeyArgs;

#[derive(Parser, Debug)]
#[command(name = "hca", version, about = "纯 Rust 实现的 CRI HCA 音频工具")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 显示头部信息
    Probe {
        /// 输入文件路径
        input: PathBuf,

        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },

    /// 解码为 WAV, 多个输入并行处理
    Decode {
        /// 输入文件路径
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// 输出文件路径, 仅在单个输入时可用; 缺省为输入文件改扩展名为 .wav
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 采样格式 (u8, s16, s24, s32, f32)
        #[arg(short = 'f', long = "format", default_value = "s32")]
        sample_format: SampleFormat,

        /// 循环区间额外重复的次数
        #[arg(long = "loop", default_value_t = 0)]
        loop_count: u32,

        /// 音量 (0~1)
        #[arg(long, default_value_t = 1.0)]
        volume: f64,

        /// 解码失败的帧以静音代替
        #[arg(long)]
        silence_errors: bool,

        /// 加密文件先用以下密钥解密
        #[command(flatten)]
        keys: KeyArgs,
    },

    /// 解密数据块
    Decrypt {
        input: PathBuf,

        /// 缺省为 <输入>.decrypted.hca
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// 加密数据块 (文件需带有类型为 0 的 ciph 段)
    Encrypt {
        input: PathBuf,

        /// 缺省为 <输入>.encrypted.hca
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        keys: KeyArgs,
    },

    /// 重新计算头部与数据块的校验和
    FixChecksum {
        input: PathBuf,

        /// 缺省为 <输入>.fixed.hca
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 插入 ciph 段
    AddCipher {
        input: PathBuf,

        /// 缺省为 <输入>.ciph.hca
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 写入的加密类型 (0, 1, 56)
        #[arg(long = "type", default_value_t = 0)]
        cipher_type: u16,
    },
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("hca", cli.verbose) {
        eprintln!("警告: {e:#}");
    }

    if let Err(e) = run(cli.command) {
        error!("{e:#}");
        eprintln!("错误: {e:#}");
        if e.downcast_ref::<HcaError>()
            .is_some_and(HcaError::is_key_mismatch_symptom)
        {
            eprintln!("提示: 数据块校验或解包失败, 密钥可能不正确");
        }
        process::exit(1);
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Probe { input, json } => probe(&input, json),
        Command::Decode {
            inputs,
            output,
            sample_format,
            loop_count,
            volume,
            silence_errors,
            keys,
        } => {
            let policy = if silence_errors {
                FrameErrorPolicy::Silence
            } else {
                FrameErrorPolicy::Abort
            };
            let options = DecodeOptions::new()
                .with_sample_format(sample_format)
                .with_loop_count(loop_count)
                .with_volume(volume)
                .with_frame_errors(policy);
            decode(&inputs, output, &options, &keys)
        }
        Command::Decrypt { input, output, keys } => {
            let mut data = read(&input)?;
            let info = hca_format::decrypt(&mut data, &keys.config_or_default())?;
            let output = output.unwrap_or_else(|| derived_path(&input, "decrypted.hca"));
            write(&output, &data)?;
            info!("已解密 {} 个数据块 -> {}", info.format.block_count, output.display());
            Ok(())
        }
        Command::Encrypt { input, output, keys } => {
            let mut data = read(&input)?;
            let info = hca_format::encrypt(&mut data, &keys.config_or_default())?;
            let output = output.unwrap_or_else(|| derived_path(&input, "encrypted.hca"));
            write(&output, &data)?;
            info!(
                "已加密 {} 个数据块 (类型 0x{:X}) -> {}",
                info.format.block_count,
                info.cipher,
                output.display()
            );
            Ok(())
        }
        Command::FixChecksum { input, output } => {
            let mut data = read(&input)?;
            hca_format::fix_checksum(&mut data)?;
            let output = output.unwrap_or_else(|| derived_path(&input, "fixed.hca"));
            write(&output, &data)
        }
        Command::AddCipher {
            input,
            output,
            cipher_type,
        } => {
            let data = read(&input)?;
            let data = HcaInfo::add_cipher_section(&data, Some(cipher_type))?;
            let output = output.unwrap_or_else(|| derived_path(&input, "ciph.hca"));
            write(&output, &data)
        }
    }
}

fn probe(input: &Path, json: bool) -> Result<()> {
    let data = read(input)?;
    let info = HcaInfo::parse(&data)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let rate = f64::from(info.format.sampling_rate);
    println!("文件: {}", input.display());
    println!("版本: {}", info.version);
    println!(
        "格式: {} Hz, {} 声道, {:.0} kbps",
        info.format.sampling_rate, info.format.channel_count, info.kbps
    );
    println!(
        "数据块: {} 个 x {} 字节, 数据偏移 {}",
        info.format.block_count, info.block_size, info.data_offset
    );
    println!(
        "采样: {} ({:.3} 秒), 起始 {}, 结束 {}",
        info.sample_count,
        info.sample_count as f64 / rate,
        info.start_at_sample,
        info.end_at_sample
    );
    if info.has_loop() {
        println!(
            "循环: {} ~ {} ({:.3} 秒)",
            info.loop_start_at_sample,
            info.loop_end_at_sample,
            info.loop_sample_count() as f64 / rate
        );
    }
    println!("加密类型: 0x{:X}", info.cipher);
    if let Some(volume) = info.rva {
        println!("音量: {volume}");
    }
    if let Some(comment) = &info.comment {
        println!("注释: {comment}");
    }
    Ok(())
}

fn decode(
    inputs: &[PathBuf],
    output: Option<PathBuf>,
    options: &DecodeOptions,
    keys: &KeyArgs,
) -> Result<()> {
    if output.is_some() && inputs.len() > 1 {
        bail!("多个输入时不能指定 -o");
    }

    let mut files = Vec::with_capacity(inputs.len());
    for input in inputs {
        let mut data = read(input)?;
        let info = HcaInfo::parse(&data).with_context(|| format!("解析 '{}' 失败", input.display()))?;
        if info.cipher != 0 {
            let config = keys.config_or_default();
            hca_format::decrypt(&mut data, &config)
                .with_context(|| format!("解密 '{}' 失败", input.display()))?;
        }
        files.push(data);
    }

    let results = hca_format::decode_many(&files, options);
    let mut failed = 0usize;
    for (input, result) in inputs.iter().zip(results) {
        let target = output
            .clone()
            .unwrap_or_else(|| input.with_extension("wav"));
        match result {
            Ok(wav) => {
                write(&target, &wav)?;
                info!("{} -> {}", input.display(), target.display());
            }
            Err(e) => {
                failed += 1;
                warn!("解码 '{}' 失败: {e}", input.display());
                eprintln!("解码 '{}' 失败: {e}", input.display());
            }
        }
    }
    if failed > 0 {
        bail!("{failed}/{} 个文件解码失败", inputs.len());
    }
    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("无法读取 '{}'", path.display()))
}

fn write(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data).with_context(|| format!("无法写入 '{}'", path.display()))
}

/// `bgm.hca` + `decrypted.hca` -> `bgm.decrypted.hca`
fn derived_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{stem}.{suffix}"))
}
