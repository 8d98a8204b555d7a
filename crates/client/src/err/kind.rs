//! Classification of the numeric error codes reported by the server.

use std::fmt;

/// Error kind for a server-reported code.
///
/// Band kinds (`System`, `Missing`, ...) cover a range of codes; the other
/// variants are specific codes inside a band. [`ErrorKind::category`] maps a
/// specific kind back to its band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    System,
    Missing,
    Security,
    Concurrency,
    General,
    Validation,
    File,
    Unknown,

    RecordMissing,
    FieldMissing,
    ScriptMissing,
    LayoutMissing,
    TableMissing,

    RecordAccessDenied,
    FieldCannotBeModified,
    FieldAccessDenied,

    RecordInUse,
    TableInUse,
    RecordModIdDoesNotMatch,

    NoRecordsFound,

    DateValidation,
    TimeValidation,
    NumberValidation,
    RangeValidation,
    UniqueValidation,
    ExistingValidation,
    ValueListValidation,
    CalculationValidation,
    InvalidFindMode,
    MaximumCharactersValidation,

    UnableToOpenFile,
}

/// Maps a server status code to its error kind. Specific codes take
/// precedence over their band.
pub fn classify(code: u32) -> ErrorKind {
    use ErrorKind::*;
    match code {
        101 => RecordMissing,
        102 => FieldMissing,
        104 => ScriptMissing,
        105 => LayoutMissing,
        106 => TableMissing,
        200 => RecordAccessDenied,
        201 => FieldCannotBeModified,
        202 => FieldAccessDenied,
        301 => RecordInUse,
        302 => TableInUse,
        306 => RecordModIdDoesNotMatch,
        401 => NoRecordsFound,
        500 => DateValidation,
        501 => TimeValidation,
        502 => NumberValidation,
        503 => RangeValidation,
        504 => UniqueValidation,
        505 => ExistingValidation,
        506 => ValueListValidation,
        507 => CalculationValidation,
        508 => InvalidFindMode,
        511 => MaximumCharactersValidation,
        802 => UnableToOpenFile,
        0..=99 => System,
        100..=199 => Missing,
        200..=299 => Security,
        300..=399 => Concurrency,
        400..=499 => General,
        500..=599 => Validation,
        800..=899 => File,
        _ => Unknown,
    }
}

impl ErrorKind {
    /// The band this kind belongs to.
    pub fn category(self) -> ErrorKind {
        use ErrorKind::*;
        match self {
            RecordMissing | FieldMissing | ScriptMissing | LayoutMissing | TableMissing => Missing,
            RecordAccessDenied | FieldCannotBeModified | FieldAccessDenied => Security,
            RecordInUse | TableInUse | RecordModIdDoesNotMatch => Concurrency,
            NoRecordsFound => General,
            DateValidation | TimeValidation | NumberValidation | RangeValidation
            | UniqueValidation | ExistingValidation | ValueListValidation
            | CalculationValidation | InvalidFindMode | MaximumCharactersValidation => Validation,
            UnableToOpenFile => File,
            band => band,
        }
    }

    pub fn name(self) -> &'static str {
        use ErrorKind::*;
        match self {
            System => "SystemError",
            Missing => "MissingError",
            Security => "SecurityError",
            Concurrency => "ConcurrencyError",
            General => "GeneralError",
            Validation => "ValidationError",
            File => "FileError",
            Unknown => "UnknownError",
            RecordMissing => "RecordMissingError",
            FieldMissing => "FieldMissingError",
            ScriptMissing => "ScriptMissingError",
            LayoutMissing => "LayoutMissingError",
            TableMissing => "TableMissingError",
            RecordAccessDenied => "RecordAccessDeniedError",
            FieldCannotBeModified => "FieldCannotBeModifiedError",
            FieldAccessDenied => "FieldAccessDeniedError",
            RecordInUse => "RecordInUseError",
            TableInUse => "TableInUseError",
            RecordModIdDoesNotMatch => "RecordModIdDoesNotMatchError",
            NoRecordsFound => "NoRecordsFoundError",
            DateValidation => "DateValidationError",
            TimeValidation => "TimeValidationError",
            NumberValidation => "NumberValidationError",
            RangeValidation => "RangeValidationError",
            UniqueValidation => "UniqueValidationError",
            ExistingValidation => "ExistingValidationError",
            ValueListValidation => "ValueListValidationError",
            CalculationValidation => "CalculationValidationError",
            InvalidFindMode => "InvalidFindModeError",
            MaximumCharactersValidation => "MaximumCharactersValidationError",
            UnableToOpenFile => "UnableToOpenFileError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
