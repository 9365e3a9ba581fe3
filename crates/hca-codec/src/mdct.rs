//! MDCT / IMDCT 变换.
//!
//! 基于 DCT-IV 的快速实现: 先做一轮成对旋转, 再做 `bits - 1` 级蝶形,
//! 最后按格雷码位反转表重排并乘以缩放系数.
//!
//! 正弦/余弦/重排表按位数缓存在 [`MdctTableCache`] 中, 由调用方持有并在多个
//! 解码器之间共享.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::{Arc, Mutex};

use hca_core::{HcaError, HcaResult};

/// 单个位数的三角函数表与重排表
#[derive(Debug)]
struct TrigTable {
    sin: Vec<f64>,
    cos: Vec<f64>,
    shuffle: Vec<usize>,
}

impl TrigTable {
    fn generate(bits: u32) -> Self {
        let size = 1usize << bits;
        let mut sin = Vec::with_capacity(size);
        let mut cos = Vec::with_capacity(size);
        for i in 0..size {
            let value = PI * (4 * i + 1) as f64 / (4 * size) as f64;
            sin.push(value.sin());
            cos.push(value.cos());
        }
        let shuffle = (0..size)
            .map(|i| bit_reverse(i ^ (i >> 1), bits))
            .collect();
        Self { sin, cos, shuffle }
    }
}

fn bit_reverse(value: usize, bits: u32) -> usize {
    if bits == 0 {
        return 0;
    }
    (value as u32).reverse_bits() as usize >> (32 - bits)
}

/// 覆盖 0..=max_bits 全部位数的变换表
#[derive(Debug)]
pub struct MdctTables {
    by_bits: Vec<TrigTable>,
}

impl MdctTables {
    fn generate(max_bits: u32) -> Self {
        Self {
            by_bits: (0..=max_bits).map(TrigTable::generate).collect(),
        }
    }

    /// 覆盖的最大位数
    pub fn max_bits(&self) -> u32 {
        self.by_bits.len() as u32 - 1
    }
}

/// 变换表缓存, 按需生成, 线程安全
#[derive(Debug, Default)]
pub struct MdctTableCache {
    tables: Mutex<HashMap<u32, Arc<MdctTables>>>,
}

impl MdctTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取覆盖 0..=bits 的表, 首次请求时生成
    pub fn get(&self, bits: u32) -> Arc<MdctTables> {
        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tables
            .entry(bits)
            .or_insert_with(|| Arc::new(MdctTables::generate(bits)))
            .clone()
    }
}

/// 单声道 MDCT 状态 (含重叠缓冲)
pub struct Mdct {
    bits: u32,
    size: usize,
    scale: f64,
    tables: Arc<MdctTables>,
    window: Vec<f64>,
    mdct_previous: Vec<f64>,
    imdct_previous: Vec<f64>,
    scratch_mdct: Vec<f64>,
    scratch_dct: Vec<f64>,
}

impl Mdct {
    /// 创建 `2^bits` 点变换, 窗长度不得小于变换长度
    pub fn new(bits: u32, window: &[f64], scale: f64, cache: &MdctTableCache) -> HcaResult<Self> {
        if !(1..=16).contains(&bits) {
            return Err(HcaError::InvalidArgument(format!("MDCT 位数超出范围: {bits}")));
        }
        let size = 1usize << bits;
        if window.len() < size {
            return Err(HcaError::InvalidArgument(format!(
                "窗长度 {} 小于 MDCT 长度 {size}",
                window.len()
            )));
        }
        Ok(Self {
            bits,
            size,
            scale,
            tables: cache.get(bits),
            window: window[..size].to_vec(),
            mdct_previous: vec![0.0; size],
            imdct_previous: vec![0.0; size],
            scratch_mdct: vec![0.0; size],
            scratch_dct: vec![0.0; size],
        })
    }

    /// 变换长度
    pub fn size(&self) -> usize {
        self.size
    }

    /// 清空重叠缓冲
    pub fn reset(&mut self) {
        self.mdct_previous.fill(0.0);
        self.imdct_previous.fill(0.0);
    }

    fn check_len(&self, input: &[f64], output: &[f64]) -> HcaResult<()> {
        if input.len() < self.size || output.len() < self.size {
            return Err(HcaError::InvalidArgument(format!(
                "MDCT 输入/输出长度不足: {}/{}, 需要 {}",
                input.len(),
                output.len(),
                self.size
            )));
        }
        Ok(())
    }

    /// 正变换: 时域 -> 频域, 与上一次输入构成重叠窗口
    pub fn run_mdct(&mut self, input: &[f64], output: &mut [f64]) -> HcaResult<()> {
        self.check_len(input, output)?;
        let size = self.size;
        let half = size >> 1;
        let w = &self.window;
        let prev = &self.mdct_previous;

        for i in 0..half {
            let a = w[half - i - 1] * -input[half + i];
            let b = w[half + i] * input[half - i - 1];
            let c = w[i] * prev[i];
            let d = w[size - i - 1] * prev[size - i - 1];
            self.scratch_mdct[i] = a - b;
            self.scratch_mdct[half + i] = c - d;
        }

        dct4(
            &self.tables,
            self.bits,
            self.scale,
            &self.scratch_mdct,
            &mut self.scratch_dct,
            output,
        );
        self.mdct_previous.copy_from_slice(&input[..size]);
        Ok(())
    }

    /// 逆变换: 频域 -> 时域, 与上一帧的后半部分重叠相加
    pub fn run_imdct(&mut self, input: &[f64], output: &mut [f64]) -> HcaResult<()> {
        self.check_len(input, output)?;
        let size = self.size;
        let half = size >> 1;

        dct4(
            &self.tables,
            self.bits,
            self.scale,
            input,
            &mut self.scratch_dct,
            &mut self.scratch_mdct,
        );

        let w = &self.window;
        let d = &self.scratch_mdct;
        let prev = &mut self.imdct_previous;
        for i in 0..half {
            output[i] = w[i] * d[i + half] + prev[i];
            output[i + half] = w[i + half] * -d[size - 1 - i] - prev[i + half];
            prev[i] = w[size - 1 - i] * -d[half - i - 1];
            prev[i + half] = w[half - i - 1] * d[i];
        }
        Ok(())
    }
}

/// DCT-IV
fn dct4(
    tables: &MdctTables,
    bits: u32,
    scale: f64,
    input: &[f64],
    temp: &mut [f64],
    output: &mut [f64],
) {
    let size = 1usize << bits;
    let last = size - 1;
    let half = size >> 1;

    let top = &tables.by_bits[bits as usize];
    for i in 0..half {
        let i2 = i * 2;
        let a = input[i2];
        let b = input[last - i2];
        temp[i2] = a * top.cos[i] + b * top.sin[i];
        temp[i2 + 1] = a * top.sin[i] - b * top.cos[i];
    }

    let stage_count = bits - 1;
    for stage in 0..stage_count {
        let block_count = 1usize << stage;
        let block_size_bits = stage_count - stage;
        let block_half_bits = block_size_bits - 1;
        let block_size = 1usize << block_size_bits;
        let block_half = 1usize << block_half_bits;
        let t = &tables.by_bits[block_half_bits as usize];

        for block in 0..block_count {
            for i in 0..block_half {
                let front = (block * block_size + i) * 2;
                let back = front + block_size;
                let a = temp[front] - temp[back];
                let b = temp[front + 1] - temp[back + 1];
                temp[front] += temp[back];
                temp[front + 1] += temp[back + 1];
                temp[back] = a * t.cos[i] + b * t.sin[i];
                temp[back + 1] = a * t.sin[i] - b * t.cos[i];
            }
        }
    }

    for (i, out) in output.iter_mut().take(size).enumerate() {
        *out = temp[top.shuffle[i]] * scale;
    }
}
