use sqlx::mysql::MySqlPool;

/// Class label as stored in the `type` column. Anything other than "real"
/// is treated as "fake".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Real,
    Fake,
}

impl Label {
    pub fn from_db(value: &str) -> Self {
        if value == "real" { Label::Real } else { Label::Fake }
    }

    /// 0 = real, 1 = fake.
    pub fn encode(self) -> i64 {
        match self {
            Label::Real => 0,
            Label::Fake => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Real => "real",
            Label::Fake => "fake",
        }
    }
}

/// One row of the `images` table; `path` is relative to the storage root.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub filename: String,
    pub path: String,
    pub label: Label,
}

#[derive(sqlx::FromRow)]
struct ImageRow {
    filename: String,
    path: String,
    #[sqlx(rename = "type")]
    kind: String,
}

pub struct ImageRepository {
    pool: MySqlPool,
}

impl ImageRepository {
    pub async fn connect(url: &str) -> Result<Self, sqlx::Error> {
        let pool = MySqlPool::connect(url).await?;
        Ok(Self { pool })
    }

    /// All records for one split ("train" or "test") at the given ratio,
    /// materialized in full.
    pub async fn fetch_split(
        &self,
        split: &str,
        split_ratio: u32,
    ) -> Result<Vec<ImageRecord>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ImageRow>(
            "SELECT filename, path, type FROM images WHERE split = ? AND split_ratio = ?",
        )
        .bind(split)
        .bind(split_ratio)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ImageRecord {
                filename: row.filename,
                path: row.path,
                label: Label::from_db(&row.kind),
            })
            .collect())
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_encoding_is_deterministic() {
        assert_eq!(Label::from_db("real").encode(), 0);
        assert_eq!(Label::from_db("fake").encode(), 1);
        // Unknown values fall back to the positive class.
        assert_eq!(Label::from_db("unexpected").encode(), 1);
    }

    #[test]
    fn label_round_trips_through_str() {
        assert_eq!(Label::from_db(Label::Real.as_str()), Label::Real);
        assert_eq!(Label::from_db(Label::Fake.as_str()), Label::Fake);
    }
}
