pub mod annotated_matrix;
