/// 整数主キーをラップする ID 型を定義する宣言型マクロ
///
/// データストアの `BIGINT` 主キーに対応する Newtype を生成する:
/// - `derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)`
/// - `new()`: 生の値から ID を作成
/// - `as_i64()`: 内部の値を取得
/// - `From<i64>` impl
///
/// 別テーブルの ID 同士を取り違えないよう、テーブルごとに別の型を定義する。
///
/// # 使用例
///
/// ```rust
/// use tenderwatch_domain::tender::TenderId;
///
/// let id = TenderId::new(42);
/// assert_eq!(id.as_i64(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $Name:ident;
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash,
            serde::Serialize, serde::Deserialize,
            derive_more::Display,
        )]
        #[display("{_0}")]
        #[serde(transparent)]
        $vis struct $Name(i64);

        impl $Name {
            /// 生の主キー値から ID を作成する
            pub const fn new(value: i64) -> Self {
                Self(value)
            }

            /// 内部の主キー値を取得する
            pub const fn as_i64(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $Name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}
