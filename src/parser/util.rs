pub const TAB_WIDTH: usize = 2;

pub fn spaces(count: usize) -> String {
    " ".repeat(count)
}
