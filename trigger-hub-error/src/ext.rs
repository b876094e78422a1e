use std::error::Error;

use crate::{LogLevel, StatusCode};

/// Расширение для ошибок библиотеки.
///
/// Каждая ошибка сообщает свой код статуса; по нему хаб выбирает уровень
/// логирования, а вызывающий код решает, имеет ли смысл повтор.
pub trait ErrorExt: Error + Send + Sync + 'static {
    fn status_code(&self) -> StatusCode;

    /// Имеет ли смысл повторить операцию. Хаб сам ничего не повторяет.
    fn is_retryable(&self) -> bool {
        self.status_code().is_retryable()
    }

    /// Уровень, с которым ошибку следует писать в журнал.
    fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;

    use super::*;

    #[derive(Debug)]
    struct MissingTrigger(pub &'static str);

    impl fmt::Display for MissingTrigger {
        fn fmt(
            &self,
            f: &mut fmt::Formatter<'_>,
        ) -> fmt::Result {
            write!(f, "trigger not found: {}", self.0)
        }
    }

    impl Error for MissingTrigger {}

    impl ErrorExt for MissingTrigger {
        fn status_code(&self) -> StatusCode {
            StatusCode::NotFound
        }
    }

    /// Тест проверяет, что методы по умолчанию берут решение из кода статуса.
    #[test]
    fn test_defaults_follow_status_code() {
        let e = MissingTrigger("initial");
        assert!(!e.is_retryable());
        assert_eq!(e.log_level(), LogLevel::Debug);
    }

    /// Тест проверяет, что трейт пригоден для `dyn`.
    #[test]
    fn test_object_safe() {
        let boxed: Box<dyn ErrorExt> = Box::new(MissingTrigger("x"));
        assert_eq!(boxed.status_code(), StatusCode::NotFound);
        assert_eq!(boxed.to_string(), "trigger not found: x");
    }
}
