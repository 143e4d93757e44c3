//! 昼夜模式判定与随机配色选择。

use std::sync::{Arc, Mutex};

use chrono::{Local, Timelike};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::CardImgError;

/// 夜间起始小时（含）
pub const NIGHT_START_HOUR: u32 = 18;
/// 夜间结束小时（不含）
pub const NIGHT_END_HOUR: u32 = 6;

/// 三态夜间模式：显式指定优先，未指定时自动判断
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NightMode {
    #[default]
    Auto,
    Day,
    Night,
}

impl From<Option<bool>> for NightMode {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => NightMode::Night,
            Some(false) => NightMode::Day,
            None => NightMode::Auto,
        }
    }
}

impl From<bool> for NightMode {
    fn from(value: bool) -> Self {
        Some(value).into()
    }
}

/// 一组命名配色（标题色 / 强调色 / 背景色）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTheme {
    pub name: &'static str,
    pub header: &'static str,
    pub accent: &'static str,
    pub background: &'static str,
}

/// 本地时钟（仅需小时）
pub trait Clock: Send + Sync {
    fn local_hour(&self) -> u32;
}

/// 进程本地时区的系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn local_hour(&self) -> u32 {
        Local::now().hour()
    }
}

/// 固定小时的时钟（测试或离线渲染用）
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u32);

impl Clock for FixedClock {
    fn local_hour(&self) -> u32 {
        self.0 % 24
    }
}

/// 配色随机源，返回 `[0, len)` 内的下标；调用方保证 `len > 0`
pub trait PaletteRandom: Send + Sync {
    fn pick_index(&self, len: usize) -> usize;
}

/// 线程本地 RNG（默认）
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl PaletteRandom for ThreadRandom {
    fn pick_index(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// 固定种子的 RNG，序列可复现
#[derive(Debug)]
pub struct SeededRandom(Mutex<StdRng>);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(Mutex::new(StdRng::seed_from_u64(seed)))
    }
}

impl PaletteRandom for SeededRandom {
    fn pick_index(&self, len: usize) -> usize {
        match self.0.lock() {
            Ok(mut rng) => rng.gen_range(0..len),
            Err(poisoned) => poisoned.into_inner().gen_range(0..len),
        }
    }
}

/// 总是返回同一下标（越界时取模）
#[derive(Debug, Clone, Copy)]
pub struct FixedIndex(pub usize);

impl PaletteRandom for FixedIndex {
    fn pick_index(&self, len: usize) -> usize {
        self.0 % len
    }
}

/// 主题选择器：时钟与随机源均可注入
#[derive(Clone)]
pub struct ThemeSelector {
    clock: Arc<dyn Clock>,
    random: Arc<dyn PaletteRandom>,
}

impl Default for ThemeSelector {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(ThreadRandom))
    }
}

impl std::fmt::Debug for ThemeSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeSelector").finish_non_exhaustive()
    }
}

impl ThemeSelector {
    pub fn new(clock: Arc<dyn Clock>, random: Arc<dyn PaletteRandom>) -> Self {
        Self { clock, random }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_random(mut self, random: Arc<dyn PaletteRandom>) -> Self {
        self.random = random;
        self
    }

    /// 显式指定总是优先；否则未启用夜间功能时为白天；否则按时钟判断
    pub fn resolve_night_mode(&self, explicit: NightMode, enabled: bool) -> bool {
        match explicit {
            NightMode::Night => true,
            NightMode::Day => false,
            NightMode::Auto => enabled && is_night_hour(self.clock.local_hour()),
        }
    }

    /// 均匀随机选择一组配色
    pub fn pick_palette(
        &self,
        template: &str,
        themes: &[ColorTheme],
    ) -> Result<ColorTheme, CardImgError> {
        if themes.is_empty() {
            return Err(CardImgError::InvalidThemeSet {
                template: template.to_string(),
            });
        }
        let idx = self.random.pick_index(themes.len()).min(themes.len() - 1);
        Ok(themes[idx])
    }
}

/// 夜间区间：[18, 24) ∪ [0, 6)
pub fn is_night_hour(hour: u32) -> bool {
    hour >= NIGHT_START_HOUR || hour < NIGHT_END_HOUR
}
