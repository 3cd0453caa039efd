use clap::ValueEnum;

/// Key used to order the slices of a series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum SortBy {
    /// InstanceNumber if every file has one, else the z coordinate of
    /// ImagePositionPatient if every file has one, else file order.
    #[default]
    Auto,
    InstanceNumber,
    ImagePositionPatient,
    TablePosition,
    None,
}

/// Where the windowing transform runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Processor {
    #[default]
    CPU,
    GPU,
}
