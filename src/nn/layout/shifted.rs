/*
 * @Author       : 老董
 * @Date         : 2026-02-12
 * @Description  : 按步长`S`对序列布局做后处理，得到时延节点专用的“移位边界表”。
 *
 * 若两条序列被前后打包在同一条流里（S：开始，E：结束，N：无输入），
 * 而时延节点要取`S = 2`帧之前的值：
 *     S X X X E S X X X X E N N
 * 则处理后变为
 *     S S X X E S S X X X E N N
 * 即回看窗口会越过序列开头的那些帧，也都当作序列开头处理。
 */

use super::{MinibatchPackingFlags, SequenceLayout};
use crate::nn::GraphError;

/// 根据步长`time_step`构造移位边界表。
///
/// `trigger`是触发重置的边界标志（过去方向为`SEQUENCE_START`，未来方向为`SEQUENCE_END`）。
/// 无论哪个方向都按时间正序扫描：在第`k`帧遇到`trigger`时，第`k..k+S-1`帧都被标记。
/// 被标记的格子只保留`NO_LABEL`位，并被置上`trigger`；计数器在遇到无输入帧时立即清零。
///
/// `time_step == 1`时结果与原布局相同；`time_step == 0`为配置错误。
pub fn build_shifted_layout(
    base: &SequenceLayout,
    time_step: usize,
    trigger: MinibatchPackingFlags,
) -> Result<SequenceLayout, GraphError> {
    if time_step == 0 {
        return Err(GraphError::InvalidConfig("时间步长必须大于0".to_string()));
    }

    let mut shifted = base.clone();
    if time_step == 1 {
        return Ok(shifted);
    }

    let mut num_reset_left = vec![0usize; base.num_streams()];
    for t in 0..base.num_frames() {
        for (s, left) in num_reset_left.iter_mut().enumerate() {
            let flag = base.flag(t, s);
            if flag.intersects(trigger) {
                *left = time_step;
            } else if flag.intersects(MinibatchPackingFlags::NO_FEATURE) {
                *left = 0;
            }

            if *left > 0 {
                *left -= 1;
                shifted.mask(t, s, MinibatchPackingFlags::NO_LABEL);
                shifted.insert(t, s, trigger);
            }
        }
    }

    Ok(shifted)
}
