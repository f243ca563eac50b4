use crate::tensor::{Tensor, multiply_and_add};

#[test]
fn test_mat_mul_matrix_matrix() {
    let a = Tensor::new(&[1., 2., 3., 4.], &[2, 2]);
    let b = Tensor::new(&[5., 6., 7., 8., 9., 10.], &[2, 3]);
    let expected = Tensor::new(&[21., 24., 27., 47., 54., 61.], &[2, 3]);
    assert_eq!(a.mat_mul(&b), expected);
}

#[test]
fn test_multiply_and_add_accumulates() {
    let a = Tensor::new(&[1., 2.], &[1, 2]);
    let b = Tensor::new(&[3., 4.], &[2, 1]);
    let mut c = Tensor::new(&[100.], &[1, 1]);
    multiply_and_add(&a, false, &b, false, &mut c);
    assert_eq!(c.number(), Some(111.));
    multiply_and_add(&a, false, &b, false, &mut c);
    assert_eq!(c.number(), Some(122.));
}

#[test]
fn test_multiply_and_add_with_transposes() {
    // aᵀ · b
    let a = Tensor::new(&[1., 2., 3., 4., 5., 6.], &[2, 3]);
    let b = Tensor::new(&[1., 0., 0., 1.], &[2, 2]);
    let mut c = Tensor::zeros(&[3, 2]);
    multiply_and_add(&a, true, &b, false, &mut c);
    assert_eq!(c, Tensor::new(&[1., 4., 2., 5., 3., 6.], &[3, 2]));

    // a · bᵀ：外积式的权重梯度
    let grad = Tensor::new(&[1., 2.], &[2, 1]);
    let input = Tensor::new(&[3., 4., 5.], &[3, 1]);
    let mut w = Tensor::zeros(&[2, 3]);
    multiply_and_add(&grad, false, &input, true, &mut w);
    assert_eq!(w, Tensor::new(&[3., 4., 5., 6., 8., 10.], &[2, 3]));
}

#[test]
#[should_panic(
    expected = "形状不一致，故无法矩阵相乘：第一个矩阵的形状为[2, 3]，第二个矩阵的形状为[2, 3]"
)]
fn test_mat_mul_panic_on_invalid_shape() {
    let a = Tensor::zeros(&[2, 3]);
    a.mat_mul(&a);
}
