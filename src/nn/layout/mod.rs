/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 小批（minibatch）的序列布局。
 *                 一个小批里并排放着若干条并行的序列流（stream），每一帧（frame）对每条流占一列，
 *                 列按“时间优先”排布：第`t`帧第`s`条流位于第`t * 流数 + s`列。
 *                 每个（帧，流）格子上带有一组边界标志，由外部数据管线构造，对循环节点只读。
 */

mod shifted;

pub use shifted::build_shifted_layout;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

use crate::nn::GraphError;

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓边界标志↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
/// 单个（帧，流）格子上的边界标志位集合
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MinibatchPackingFlags {
    bits: u8,
}

impl MinibatchPackingFlags {
    pub const NONE: Self = Self { bits: 0 };
    /// 序列的第一帧
    pub const SEQUENCE_START: Self = Self { bits: 1 << 0 };
    /// 序列的最后一帧
    pub const SEQUENCE_END: Self = Self { bits: 1 << 1 };
    /// 该帧没有特征（填充帧）
    pub const NO_FEATURE: Self = Self { bits: 1 << 2 };
    /// 该帧不参与损失计算
    pub const NO_LABEL: Self = Self { bits: 1 << 3 };
    pub const NO_INPUT: Self = Self {
        bits: Self::NO_FEATURE.bits | Self::NO_LABEL.bits,
    };

    const ALL_BITS: u8 = 0b1111;

    pub const fn bits(self) -> u8 {
        self.bits
    }

    /// 丢弃未定义的位
    pub const fn from_bits_truncate(bits: u8) -> Self {
        Self {
            bits: bits & Self::ALL_BITS,
        }
    }

    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// `other`中的每一位都被置上
    pub const fn contains(self, other: Self) -> bool {
        self.bits & other.bits == other.bits
    }

    /// 与`other`至少有一位重叠
    pub const fn intersects(self, other: Self) -> bool {
        self.bits & other.bits != 0
    }

    pub const fn union(self, other: Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    pub fn insert(&mut self, other: Self) {
        self.bits |= other.bits;
    }

    pub fn remove(&mut self, other: Self) {
        self.bits &= !other.bits;
    }

    /// 只保留`keep`中的位
    pub fn mask(&mut self, keep: Self) {
        self.bits &= keep.bits;
    }

    /// 该格子没有输入：既不贡献值，也不贡献梯度
    pub const fn is_no_input(self) -> bool {
        self.intersects(Self::NO_FEATURE)
    }

    /// 既不是边界也不是填充的普通帧（`NO_LABEL`不影响判断）
    pub const fn is_plain(self) -> bool {
        !self.intersects(Self::from_bits_truncate(
            Self::SEQUENCE_START.bits | Self::SEQUENCE_END.bits | Self::NO_FEATURE.bits,
        ))
    }
}

impl BitOr for MinibatchPackingFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            bits: self.bits | rhs.bits,
        }
    }
}

impl BitOrAssign for MinibatchPackingFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.bits |= rhs.bits;
    }
}

impl BitAnd for MinibatchPackingFlags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self {
            bits: self.bits & rhs.bits,
        }
    }
}

impl fmt::Debug for MinibatchPackingFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "NONE");
        }
        let names = [
            (Self::SEQUENCE_START, "SEQUENCE_START"),
            (Self::SEQUENCE_END, "SEQUENCE_END"),
            (Self::NO_FEATURE, "NO_FEATURE"),
            (Self::NO_LABEL, "NO_LABEL"),
        ];
        let parts: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", parts.join(" | "))
    }
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑边界标志↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

/// 帧的遍历顺序
pub(crate) fn frame_order(num_frames: usize, ascending: bool) -> Vec<usize> {
    if ascending {
        (0..num_frames).collect()
    } else {
        (0..num_frames).rev().collect()
    }
}

/// 第`t`帧在缓冲区中占据的列区间`[t * num_streams, (t + 1) * num_streams)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRange {
    pub t: usize,
    pub num_streams: usize,
}

impl FrameRange {
    pub const fn new(t: usize, num_streams: usize) -> Self {
        Self { t, num_streams }
    }

    pub const fn start_col(&self) -> usize {
        self.t * self.num_streams
    }
}

/// 一个小批的序列布局：`num_frames`帧 × `num_streams`条流，每格一组标志
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceLayout {
    num_streams: usize,
    num_frames: usize,
    // 按列排布，下标为`t * num_streams + s`
    flags: Vec<MinibatchPackingFlags>,
}

impl SequenceLayout {
    /// 所有格子都是`NONE`的布局（即各条流都是跨小批延续的长序列）
    pub fn new(num_streams: usize, num_frames: usize) -> Self {
        Self {
            num_streams,
            num_frames,
            flags: vec![MinibatchPackingFlags::NONE; num_streams * num_frames],
        }
    }

    /// 由按列排布的标志构造，长度必须等于`num_streams * num_frames`
    pub fn from_flags(
        num_streams: usize,
        num_frames: usize,
        flags: Vec<MinibatchPackingFlags>,
    ) -> Result<Self, GraphError> {
        if flags.len() != num_streams * num_frames {
            return Err(GraphError::DimensionMismatch {
                expected: num_streams * num_frames,
                got: flags.len(),
                message: "布局标志的个数须等于流数与帧数之积".to_string(),
            });
        }
        Ok(Self {
            num_streams,
            num_frames,
            flags,
        })
    }

    pub const fn num_streams(&self) -> usize {
        self.num_streams
    }

    pub const fn num_frames(&self) -> usize {
        self.num_frames
    }

    /// 缓冲区应有的列数
    pub const fn num_cols(&self) -> usize {
        self.num_streams * self.num_frames
    }

    pub const fn frame(&self, t: usize) -> FrameRange {
        FrameRange::new(t, self.num_streams)
    }

    pub fn flag(&self, t: usize, stream: usize) -> MinibatchPackingFlags {
        self.flags[t * self.num_streams + stream]
    }

    /// 带范围检查的`flag`
    pub fn checked_flag(&self, t: usize, stream: usize) -> Result<MinibatchPackingFlags, GraphError> {
        if t >= self.num_frames || stream >= self.num_streams {
            return Err(GraphError::InvalidOperation(format!(
                "（帧{t}，流{stream}）超出布局范围（{}帧，{}条流）",
                self.num_frames, self.num_streams
            )));
        }
        Ok(self.flag(t, stream))
    }

    /// 覆盖写入一个格子的标志
    pub fn set(&mut self, t: usize, stream: usize, flag: MinibatchPackingFlags) {
        self.flags[t * self.num_streams + stream] = flag;
    }

    /// 在一个格子上追加标志
    pub fn insert(&mut self, t: usize, stream: usize, flag: MinibatchPackingFlags) {
        self.flags[t * self.num_streams + stream].insert(flag);
    }

    pub fn mask(&mut self, t: usize, stream: usize, keep: MinibatchPackingFlags) {
        self.flags[t * self.num_streams + stream].mask(keep);
    }

    /// 第`t`帧各条流的标志
    pub fn stream_flags(&self, t: usize) -> &[MinibatchPackingFlags] {
        let start = t * self.num_streams;
        &self.flags[start..start + self.num_streams]
    }

    /// 第`t`帧所有流标志的并集
    pub fn frame_flags(&self, t: usize) -> MinibatchPackingFlags {
        self.stream_flags(t)
            .iter()
            .fold(MinibatchPackingFlags::NONE, |acc, &f| acc | f)
    }

    /// 第`t`帧是否有任意一条流带有`flag`中的某一位
    pub fn frame_has(&self, t: usize, flag: MinibatchPackingFlags) -> bool {
        self.frame_flags(t).intersects(flag)
    }

    /// 缓冲区列数须与布局一致
    pub fn check_columns(&self, cols: usize, what: &str) -> Result<(), GraphError> {
        if cols != self.num_cols() {
            return Err(GraphError::DimensionMismatch {
                expected: self.num_cols(),
                got: cols,
                message: format!("{what}的列数与序列布局不一致"),
            });
        }
        Ok(())
    }
}
