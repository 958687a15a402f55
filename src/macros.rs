macro_rules! emit {
    ($self:expr, $($format:tt)*) => {
        $self
            .lines
            .push(format!("    {}", format_args!($($format)*)))
    };
}
