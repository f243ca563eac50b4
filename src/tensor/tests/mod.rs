mod mat_mul;
mod save_load;
