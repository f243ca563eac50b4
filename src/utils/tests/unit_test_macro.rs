use crate::nn::GraphError;
use crate::{assert_err, assert_panic};

#[test]
fn test_assert_panic_macro() {
    assert_panic!(panic!("test panic"));
    assert_panic!(panic!("custom test panic msg"), "custom test panic msg");
}

#[test]
fn test_assert_err_macro() {
    let result: Result<(), GraphError> = Err(GraphError::InvalidConfig("时间步长必须大于0".into()));
    assert_err!(result);
    assert_err!(result, GraphError::InvalidConfig("时间步长必须大于0"));
    assert_err!(result, GraphError::InvalidConfig(msg) if msg.contains("时间步长"));

    let result: Result<(), GraphError> = Err(GraphError::ShapeMismatch {
        expected: vec![3, 6],
        got: vec![3, 5],
        message: "输入门权重".into(),
    });
    assert_err!(result, GraphError::ShapeMismatch([3, 6], [3, 5], "输入门权重"));
    assert_err!(result, GraphError::ShapeMismatch { .. });

    let result: Result<(), GraphError> = Err(GraphError::DimensionMismatch {
        expected: 4,
        got: 2,
        message: "行数".into(),
    });
    assert_err!(result, GraphError::DimensionMismatch(4, 2));
}
