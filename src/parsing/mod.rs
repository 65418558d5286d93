pub mod html_fragments;
pub mod html_lines;
