use crate::tensor::Tensor;
use std::fmt;

impl Tensor {
    pub fn print(&self) {
        println!("{self}");
    }
}

// 行或列超过6时只展示首尾各3个
impl fmt::Display for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fn picked(n: usize) -> Vec<Option<usize>> {
            if n > 6 {
                let mut v: Vec<Option<usize>> = (0..3).map(Some).collect();
                v.push(None);
                v.extend((n - 3..n).map(Some));
                v
            } else {
                (0..n).map(Some).collect()
            }
        }

        let rows = picked(self.rows());
        let cols = picked(self.cols());
        write!(f, "[")?;
        for (i, row) in rows.iter().enumerate() {
            if i > 0 {
                write!(f, "\n ")?;
            }
            match row {
                Some(r) => {
                    write!(f, "[")?;
                    for (j, col) in cols.iter().enumerate() {
                        if j > 0 {
                            write!(f, ", ")?;
                        }
                        match col {
                            Some(c) => write!(f, "{:8.4}", self.data[[*r, *c]])?,
                            None => write!(f, "   ..   ")?,
                        }
                    }
                    write!(f, "]")?;
                }
                None => write!(f, " ..")?,
            }
        }
        write!(f, "]")?;
        writeln!(f, "\n形状: {:?}", self.shape())
    }
}
