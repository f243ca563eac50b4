/*
 * @Author       : 老董
 * @Date         : 2026-02-14
 * @Description  : 融合LSTM节点的单元测试（前向、BPTT、跨小批交接）
 */

use crate::assert_err;
use crate::nn::{
    CopyNodeFlags, ErrorHandoff, GraphError, Lstm, LstmConfig, MinibatchPackingFlags as F,
    NodeInput, NodeType, SequenceLayout, StorageKind, TraitNode,
};
use crate::tensor::Tensor;
use approx::assert_abs_diff_eq;

const INPUT_DIM: usize = 2;
const OUTPUT_DIM: usize = 3;
const GATED_COLS: usize = INPUT_DIM + OUTPUT_DIM + 2;
const CELL_COLS: usize = INPUT_DIM + OUTPUT_DIM + 1;

fn lstm(default_state: f32) -> Result<Lstm, GraphError> {
    Lstm::new("lstm", INPUT_DIM, OUTPUT_DIM, LstmConfig { default_state })
}

fn inputs(obs: Tensor, gates: [Tensor; 4]) -> [NodeInput; 5] {
    let [input, forget, output, cell] = gates;
    [
        NodeInput::new("obs", obs),
        NodeInput::parameter("w_input", input),
        NodeInput::parameter("w_forget", forget),
        NodeInput::parameter("w_output", output),
        NodeInput::parameter("w_cell", cell),
    ]
}

fn uniform_inputs(cols: usize, value: f32) -> [NodeInput; 5] {
    inputs(
        Tensor::filled(&[INPUT_DIM, cols], value),
        [
            Tensor::filled(&[OUTPUT_DIM, GATED_COLS], value),
            Tensor::filled(&[OUTPUT_DIM, GATED_COLS], value),
            Tensor::filled(&[OUTPUT_DIM, GATED_COLS], value),
            Tensor::filled(&[OUTPUT_DIM, CELL_COLS], value),
        ],
    )
}

fn random_gates() -> [Tensor; 4] {
    [
        Tensor::new_random(-0.5, 0.5, &[OUTPUT_DIM, GATED_COLS]),
        Tensor::new_random(-0.5, 0.5, &[OUTPUT_DIM, GATED_COLS]),
        Tensor::new_random(-0.5, 0.5, &[OUTPUT_DIM, GATED_COLS]),
        Tensor::new_random(-0.5, 0.5, &[OUTPUT_DIM, CELL_COLS]),
    ]
}

/// 一次完整的反向：全部输出梯度置为`grad`，再对5个输入各求一次
fn backward_all(node: &mut Lstm, inputs: &mut [NodeInput; 5], grad: f32) -> Result<(), GraphError> {
    let shape = node.value().shape().to_vec();
    node.set_grad(&Tensor::filled(&shape, grad))?;
    for k in 0..5 {
        node.compute_input_partial(k, inputs)?;
    }
    Ok(())
}

/*↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓参考场景↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓↓*/
// 输入维度2、输出维度3、3帧、1条流，权重与输入全为0.1，细胞初始状态为0
fn reference_layout() -> SequenceLayout {
    SequenceLayout::from_flags(1, 3, vec![F::SEQUENCE_START, F::NONE, F::NONE]).unwrap()
}

#[test]
fn test_reference_forward() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    node.set_layout(reference_layout())?;
    let inputs = uniform_inputs(3, 0.1);
    node.validate(&inputs)?;
    node.evaluate(&inputs)?;

    let value = node.value();
    assert_eq!(value.shape(), &[OUTPUT_DIM, 3]);
    assert_abs_diff_eq!(value.get(0, 0), 0.0335975, epsilon = 1e-5);
    assert_abs_diff_eq!(value.get(0, 1), 0.05485132, epsilon = 1e-5);
    assert_abs_diff_eq!(value.get(0, 2), 0.06838435, epsilon = 1e-5);
    // 权重全相同，各行的输出也相同
    for t in 0..3 {
        assert_abs_diff_eq!(value.get(0, t), value.get(1, t), epsilon = 1e-7);
    }
    assert!(!value.has_nan());
    assert!(!node.state().has_nan());
    Ok(())
}

#[test]
fn test_reference_gate_gradients() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    node.set_layout(reference_layout())?;
    let mut inputs = uniform_inputs(3, 0.1);
    node.evaluate(&inputs)?;
    backward_all(&mut node, &mut inputs, 1.0)?;
    assert!(node.is_gradient_computed());

    // 偏置、Wx、Wh、peephole各取一列的第0行
    let input_gate = inputs[1].grad();
    assert_abs_diff_eq!(input_gate.get(0, 0), 0.07843818, epsilon = 1e-5);
    assert_abs_diff_eq!(input_gate.get(0, 1), 0.00784382, epsilon = 1e-5);
    assert_abs_diff_eq!(input_gate.get(0, 3), 0.00192997, epsilon = 1e-5);
    assert_abs_diff_eq!(input_gate.get(0, 6), 0.00362767, epsilon = 1e-5);

    let forget_gate = inputs[2].grad();
    assert_abs_diff_eq!(forget_gate.get(0, 0), 0.02738655, epsilon = 1e-5);
    assert_abs_diff_eq!(forget_gate.get(0, 1), 0.00273866, epsilon = 1e-5);
    assert_abs_diff_eq!(forget_gate.get(0, 3), 0.00120922, epsilon = 1e-5);
    assert_abs_diff_eq!(forget_gate.get(0, 6), 0.00227184, epsilon = 1e-5);

    let output_gate = inputs[3].grad();
    assert_abs_diff_eq!(output_gate.get(0, 0), 0.07801557, epsilon = 1e-5);
    assert_abs_diff_eq!(output_gate.get(0, 1), 0.00780156, epsilon = 1e-5);
    assert_abs_diff_eq!(output_gate.get(0, 3), 0.00268089, epsilon = 1e-5);
    assert_abs_diff_eq!(output_gate.get(0, 6), 0.00809852, epsilon = 1e-5);

    let cell = inputs[4].grad();
    assert_eq!(cell.shape(), &[OUTPUT_DIM, CELL_COLS]);
    assert_abs_diff_eq!(cell.get(0, 0), 1.3075038, epsilon = 1e-5);
    assert_abs_diff_eq!(cell.get(0, 1), 0.13075038, epsilon = 1e-5);
    assert_abs_diff_eq!(cell.get(0, 3), 0.03080355, epsilon = 1e-5);

    assert_eq!(inputs[0].grad().shape(), &[INPUT_DIM, 3]);
    Ok(())
}

#[test]
fn test_sequence_start_inside_minibatch() -> Result<(), GraphError> {
    // 没有历史时，首帧的上一状态同样是0，所以第1帧重新开始后的输出与第0帧一致
    let mut node = lstm(0.)?;
    node.set_layout(SequenceLayout::from_flags(
        1,
        3,
        vec![F::NONE, F::SEQUENCE_START, F::NONE],
    )?)?;
    let inputs = uniform_inputs(3, 0.1);
    node.evaluate(&inputs)?;

    let value = node.value();
    assert_abs_diff_eq!(value.get(0, 0), 0.0335975, epsilon = 1e-5);
    assert_abs_diff_eq!(value.get(0, 1), value.get(0, 0), epsilon = 1e-7);
    assert_abs_diff_eq!(value.get(0, 2), 0.05485132, epsilon = 1e-5);
    Ok(())
}
/*↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑参考场景↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑↑*/

#[test]
fn test_default_state_applies_at_sequence_start() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    node.set_layout(reference_layout())?;
    let inputs = uniform_inputs(3, 0.1);
    node.evaluate(&inputs)?;
    let from_zero = node.value().clone();

    node.set_default_state(0.5);
    assert_eq!(node.config().default_state, 0.5);
    node.evaluate(&inputs)?;
    assert!(node.value().get(0, 0) > from_zero.get(0, 0));
    Ok(())
}

#[test]
fn test_gradient_is_delivered_once_per_minibatch() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    node.set_layout(reference_layout())?;
    let mut inputs = uniform_inputs(3, 0.1);
    node.evaluate(&inputs)?;
    backward_all(&mut node, &mut inputs, 1.0)?;
    let first = inputs[4].grad().clone();

    // 同一小批内重复请求不再累加
    node.compute_input_partial(4, &mut inputs)?;
    assert_eq!(inputs[4].grad(), &first);

    // 新的前向之后会再次累加
    node.evaluate(&inputs)?;
    assert!(!node.is_gradient_computed());
    node.compute_input_partial(4, &mut inputs)?;
    assert_abs_diff_eq!(*inputs[4].grad(), &first * 2., epsilon = 1e-6);
    Ok(())
}

#[test]
fn test_validation_errors() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    let inputs = uniform_inputs(3, 0.1);

    assert_err!(
        node.validate(&inputs[..4]),
        GraphError::InvalidInputCount { expected: 5, got: 4 }
    );

    let mut sparse = uniform_inputs(3, 0.1);
    sparse[2] = sparse[2].clone().with_storage(StorageKind::Sparse);
    assert_err!(
        node.validate(&sparse),
        GraphError::InvalidOperation(msg) if msg.contains("稠密")
    );

    let mut empty = uniform_inputs(3, 0.1);
    empty[3].set_value(Tensor::empty());
    assert_err!(node.validate(&empty), GraphError::InvalidConfig(_));

    // 权重必须是可学习参数
    let mut frozen = uniform_inputs(3, 0.1);
    frozen[1] = NodeInput::new("w_input", frozen[1].value().clone());
    assert_err!(
        node.validate(&frozen),
        GraphError::InvalidOperation(msg) if msg.contains("可学习参数")
    );

    let mut no_obs = uniform_inputs(3, 0.1);
    no_obs[0].set_value(Tensor::empty());
    assert_err!(
        node.validate(&no_obs),
        GraphError::InvalidConfig(msg) if msg.contains("观测")
    );

    let mut narrow = uniform_inputs(3, 0.1);
    narrow[1].set_value(Tensor::zeros(&[OUTPUT_DIM, CELL_COLS]));
    assert_err!(node.validate(&narrow), GraphError::DimensionMismatch(7, 6));

    let mut tall = uniform_inputs(3, 0.1);
    tall[4].set_value(Tensor::zeros(&[OUTPUT_DIM + 1, CELL_COLS]));
    assert_err!(node.validate(&tall), GraphError::DimensionMismatch(3, 4));

    let mut wrong_obs = uniform_inputs(3, 0.1);
    wrong_obs[0].set_value(Tensor::zeros(&[INPUT_DIM + 1, 3]));
    assert_err!(node.validate(&wrong_obs), GraphError::DimensionMismatch(2, 3));

    assert_err!(
        Lstm::new("lstm", 0, OUTPUT_DIM, LstmConfig::default()),
        GraphError::InvalidConfig(_)
    );
    node.validate(&inputs)?;
    Ok(())
}

#[test]
fn test_evaluate_errors() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    let mut inputs = uniform_inputs(3, 0.1);
    assert_err!(node.evaluate(&inputs), GraphError::InvalidOperation(_));

    node.set_layout(SequenceLayout::new(1, 4))?;
    assert_err!(node.evaluate(&inputs), GraphError::DimensionMismatch(4, 3));
    assert_err!(
        node.evaluate_frame(0, &inputs),
        GraphError::InvalidOperation(msg) if msg.contains("整个小批")
    );

    node.set_layout(reference_layout())?;
    node.evaluate(&inputs)?;
    assert_err!(
        node.compute_input_partial(5, &mut inputs),
        GraphError::InvalidOperation(_)
    );
    assert_err!(
        node.compute_input_partial_frame(0, 0, &mut inputs),
        GraphError::InvalidOperation(_)
    );

    // 梯度缓冲区的形状须与值一致
    *node.grad_mut() = Tensor::zeros(&[OUTPUT_DIM, 1]);
    assert_err!(
        node.compute_input_partial(0, &mut inputs),
        GraphError::ShapeMismatch { .. }
    );
    Ok(())
}

#[test]
fn test_backward_rejects_layout_changed_after_forward() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    let mut inputs = uniform_inputs(6, 0.1);
    node.set_layout(SequenceLayout::new(2, 3))?;
    node.evaluate(&inputs)?;
    node.set_grad(&Tensor::ones(&[OUTPUT_DIM, 6]))?;

    // 列数相同但流数不同
    node.set_layout(SequenceLayout::new(3, 2))?;
    assert_err!(
        node.compute_input_partial(0, &mut inputs),
        GraphError::DimensionMismatch(3, 2)
    );

    node.set_layout(SequenceLayout::new(2, 2))?;
    assert_err!(
        node.compute_input_partial(0, &mut inputs),
        GraphError::DimensionMismatch(4, 6)
    );

    // 换回前向时的布局后即可正常反向
    node.set_layout(SequenceLayout::new(2, 3))?;
    node.compute_input_partial(0, &mut inputs)?;
    assert_eq!(inputs[0].grad().shape(), &[INPUT_DIM, 6]);
    Ok(())
}

#[test]
fn test_last_state_snapshot_skips_no_input_frames() -> Result<(), GraphError> {
    // 2条流、3帧：流1的最后一帧没有输入
    let layout = SequenceLayout::from_flags(
        2,
        3,
        vec![
            F::SEQUENCE_START,
            F::SEQUENCE_START,
            F::NONE,
            F::SEQUENCE_END,
            F::SEQUENCE_END,
            F::NO_INPUT,
        ],
    )?;
    let mut node = lstm(0.1)?;
    node.set_layout(layout)?;
    let inputs = inputs(Tensor::new_random(-1., 1., &[INPUT_DIM, 6]), random_gates());
    node.evaluate(&inputs)?;

    let handoff = node.forward_handoff();
    assert_eq!(handoff.output.column_to_vec(0), node.value().column_to_vec(4));
    assert_eq!(handoff.output.column_to_vec(1), node.value().column_to_vec(3));
    assert_eq!(handoff.state.column_to_vec(0), node.state().column_to_vec(4));
    assert_eq!(handoff.state.column_to_vec(1), node.state().column_to_vec(3));

    assert_eq!(node.get_history(true), handoff.to_matrix());
    assert_eq!(node.get_history(false).shape(), &[OUTPUT_DIM, 4]);
    Ok(())
}

#[test]
fn test_history_accessors() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    let history = Tensor::new_random(-1., 1., &[OUTPUT_DIM, 4]);
    node.set_history(&history)?;
    assert_eq!(node.get_history(false), history);
    assert_eq!(node.history().past_output, history.column_slice(0, 2));
    assert_eq!(node.history().past_state, history.column_slice(2, 2));

    assert_err!(
        node.set_history(&Tensor::zeros(&[OUTPUT_DIM, 3])),
        GraphError::DimensionMismatch { .. }
    );
    assert_err!(
        node.set_history(&Tensor::zeros(&[OUTPUT_DIM + 1, 2])),
        GraphError::DimensionMismatch(3, 4)
    );
    Ok(())
}

#[test]
fn test_forward_handoff_continues_sequence() -> Result<(), GraphError> {
    // 一个4帧的小批与两个2帧的小批（中间交接状态）结果一致
    let obs = Tensor::new_random(-1., 1., &[INPUT_DIM, 4]);
    let gates = random_gates();

    let mut whole = lstm(0.1)?;
    whole.set_layout(SequenceLayout::from_flags(
        1,
        4,
        vec![F::SEQUENCE_START, F::NONE, F::NONE, F::NONE],
    )?)?;
    whole.evaluate(&inputs(obs.clone(), gates.clone()))?;

    let mut split = lstm(0.1)?;
    split.set_layout(SequenceLayout::from_flags(
        1,
        2,
        vec![F::SEQUENCE_START, F::NONE],
    )?)?;
    split.evaluate(&inputs(obs.column_slice(0, 2), gates.clone()))?;
    assert_abs_diff_eq!(
        *split.value(),
        whole.value().column_slice(0, 2),
        epsilon = 1e-6
    );

    let handoff = split.forward_handoff();
    split.accept_forward_handoff(handoff)?;
    split.set_layout(SequenceLayout::new(1, 2))?;
    split.evaluate(&inputs(obs.column_slice(2, 2), gates))?;
    assert_abs_diff_eq!(
        *split.value(),
        whole.value().column_slice(2, 2),
        epsilon = 1e-6
    );
    Ok(())
}

#[test]
fn test_error_handoff_matches_whole_sequence() -> Result<(), GraphError> {
    let obs = Tensor::new_random(-1., 1., &[INPUT_DIM, 4]);
    let gates = random_gates();

    let mut whole = lstm(0.1)?;
    whole.set_layout(SequenceLayout::from_flags(
        1,
        4,
        vec![F::SEQUENCE_START, F::NONE, F::NONE, F::NONE],
    )?)?;
    let mut whole_inputs = inputs(obs.clone(), gates.clone());
    whole.evaluate(&whole_inputs)?;
    backward_all(&mut whole, &mut whole_inputs, 1.0)?;

    // 前一半与后一半各用一个节点，状态向后交接，误差向前交接
    let mut first = lstm(0.1)?;
    first.set_layout(SequenceLayout::from_flags(
        1,
        2,
        vec![F::SEQUENCE_START, F::NONE],
    )?)?;
    let mut first_inputs = inputs(obs.column_slice(0, 2), gates.clone());
    first.evaluate(&first_inputs)?;

    let mut second = lstm(0.1)?;
    second.set_layout(SequenceLayout::new(1, 2))?;
    second.accept_forward_handoff(first.forward_handoff())?;
    let mut second_inputs = inputs(obs.column_slice(2, 2), gates);
    second.evaluate(&second_inputs)?;

    assert_err!(second.backward_handoff(), GraphError::InvalidOperation(_));
    backward_all(&mut second, &mut second_inputs, 1.0)?;
    let errors = second.backward_handoff()?;
    assert_eq!(
        second.get_errors_to_previous_minibatch()?,
        errors.to_matrix()
    );

    first.accept_error_handoff(errors)?;
    assert!(first.history().errors_from_future.is_some());
    backward_all(&mut first, &mut first_inputs, 1.0)?;
    // 下一小批的误差只用一次
    assert!(first.history().errors_from_future.is_none());

    for k in 1..5 {
        let combined = first_inputs[k].grad() + second_inputs[k].grad();
        assert_abs_diff_eq!(combined, *whole_inputs[k].grad(), epsilon = 1e-5);
    }
    assert_abs_diff_eq!(
        *first_inputs[0].grad(),
        whole_inputs[0].grad().column_slice(0, 2),
        epsilon = 1e-5
    );
    assert_abs_diff_eq!(
        *second_inputs[0].grad(),
        whole_inputs[0].grad().column_slice(2, 2),
        epsilon = 1e-5
    );

    // 序列从本小批开头开始，不再向更早的小批传误差
    let to_previous = first.get_errors_to_previous_minibatch()?;
    assert_eq!(to_previous, Tensor::zeros(&[OUTPUT_DIM, 2]));
    Ok(())
}

#[test]
fn test_future_errors_skip_finished_streams() -> Result<(), GraphError> {
    // 流0的序列在本小批内结束，流1延续到下一个小批
    let layout = SequenceLayout::from_flags(
        2,
        2,
        vec![F::SEQUENCE_START, F::SEQUENCE_START, F::SEQUENCE_END, F::NONE],
    )?;
    let obs = Tensor::new_random(-1., 1., &[INPUT_DIM, 4]);
    let gates = random_gates();

    let mut plain = lstm(0.1)?;
    plain.set_layout(layout.clone())?;
    let mut plain_inputs = inputs(obs.clone(), gates.clone());
    plain.evaluate(&plain_inputs)?;
    backward_all(&mut plain, &mut plain_inputs, 0.)?;

    let mut with_future = lstm(0.1)?;
    with_future.set_layout(layout)?;
    let mut future_inputs = inputs(obs, gates);
    with_future.evaluate(&future_inputs)?;
    with_future.set_errors_from_future_minibatch(&Tensor::ones(&[OUTPUT_DIM, 4]))?;
    backward_all(&mut with_future, &mut future_inputs, 0.)?;

    // 输出梯度全为0时，只有延续的流1收到了误差
    let plain_obs = plain_inputs[0].grad();
    let future_obs = future_inputs[0].grad();
    assert_eq!(*plain_obs, Tensor::zeros(&[INPUT_DIM, 4]));
    assert_eq!(future_obs.column_to_vec(0), vec![0.; INPUT_DIM]);
    assert_eq!(future_obs.column_to_vec(2), vec![0.; INPUT_DIM]);
    assert!(future_obs.column_to_vec(3).iter().any(|g| *g != 0.));
    Ok(())
}

#[test]
fn test_error_handoff_shape_checks() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    assert_err!(
        node.set_errors_from_future_minibatch(&Tensor::zeros(&[OUTPUT_DIM, 3])),
        GraphError::DimensionMismatch { .. }
    );
    assert_err!(
        node.accept_error_handoff(ErrorHandoff {
            output_error: Tensor::zeros(&[OUTPUT_DIM, 2]),
            state_error: Tensor::zeros(&[OUTPUT_DIM, 1]),
        }),
        GraphError::ShapeMismatch { .. }
    );

    // 误差的列数须等于流数
    node.set_layout(reference_layout())?;
    let mut inputs = uniform_inputs(3, 0.1);
    node.evaluate(&inputs)?;
    node.set_errors_from_future_minibatch(&Tensor::zeros(&[OUTPUT_DIM, 4]))?;
    node.set_grad(&Tensor::ones(&[OUTPUT_DIM, 3]))?;
    assert_err!(
        node.compute_input_partial(0, &mut inputs),
        GraphError::DimensionMismatch(1, 2)
    );
    Ok(())
}

#[test]
fn test_segment_info() -> Result<(), GraphError> {
    let mut node = lstm(0.)?;
    assert_err!(node.segment_info(0, 0), GraphError::InvalidOperation(_));
    node.set_layout(reference_layout())?;
    assert_eq!(node.segment_info(0, 0)?, F::SEQUENCE_START);
    assert_eq!(node.segment_info(2, 0)?, F::NONE);
    assert_err!(node.segment_info(0, 1), GraphError::InvalidOperation(_));
    Ok(())
}

#[test]
fn test_copy_to() -> Result<(), GraphError> {
    let mut node = lstm(0.2)?;
    node.set_layout(reference_layout())?;
    let inputs = inputs(Tensor::new_random(-1., 1., &[INPUT_DIM, 3]), random_gates());
    node.evaluate(&inputs)?;
    node.set_errors_from_future_minibatch(&Tensor::ones(&[OUTPUT_DIM, 2]))?;

    let NodeType::Lstm(copy) = node.copy_to("lstm_copy", CopyNodeFlags::COPY_VALUE) else {
        panic!("复制出的节点类型不对");
    };
    assert_eq!(copy.name(), "lstm_copy");
    assert_eq!(copy.value(), node.value());
    assert_eq!(copy.state(), node.state());
    assert_eq!(copy.get_history(true), node.get_history(true));
    assert!(copy.history().errors_from_future.is_some());
    assert!(!copy.is_gradient_computed());

    let NodeType::Lstm(fresh) = node.copy_to("lstm_fresh", CopyNodeFlags::NONE) else {
        panic!("复制出的节点类型不对");
    };
    assert_eq!(fresh.default_state(), 0.2);
    assert_eq!((fresh.input_dim(), fresh.output_dim()), (INPUT_DIM, OUTPUT_DIM));
    assert!(fresh.value().is_empty());
    assert!(fresh.history().errors_from_future.is_none());
    Ok(())
}

#[test]
fn test_input_grads_have_weight_shapes() -> Result<(), GraphError> {
    let mut node = lstm(0.1)?;
    node.set_layout(SequenceLayout::new(2, 3))?;
    let mut inputs = inputs(Tensor::new_random(-1., 1., &[INPUT_DIM, 6]), random_gates());
    node.evaluate(&inputs)?;
    backward_all(&mut node, &mut inputs, 0.5)?;
    for input in &inputs {
        assert!(input.grad().is_same_shape(input.value()));
        assert!(!input.grad().has_nan());
    }
    Ok(())
}
