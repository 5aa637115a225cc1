use crate::core::pipeline_sequence::ChunkReader;
use crate::domain::model::{ProductGroup, Row};
use crate::utils::error::Result;

/// 決定一列是否延續目前商品的規則
#[derive(Debug, Clone)]
pub struct GroupingRule {
    pub group_by: String,
    pub schema_column: String,
}

impl GroupingRule {
    pub fn new(group_by: impl Into<String>, schema_column: impl Into<String>) -> Self {
        Self {
            group_by: group_by.into(),
            schema_column: schema_column.into(),
        }
    }

    /// 有商品鍵時比對鍵值；沒有鍵時，只有 schema 欄也為空的列才是 variant 延續列。
    /// schema 欄非空且與群組不同時一律另起新群組。
    pub fn continues(&self, first: &Row, row: &Row) -> bool {
        let schema = row.non_empty(&self.schema_column);
        if schema.is_some() && schema != first.non_empty(&self.schema_column) {
            return false;
        }

        match row.non_empty(&self.group_by) {
            Some(key) => first.non_empty(&self.group_by) == Some(key),
            None => schema.is_none(),
        }
    }

    pub fn into_predicate(self) -> impl Fn(&Row, &Row) -> bool + Send + 'static {
        move |first: &Row, row: &Row| self.continues(first, row)
    }
}

/// 把連續的資料列組成 ProductGroup；「同一商品」的判斷由外部提供
pub struct RecordGrouper<I, P> {
    rows: I,
    same_product: P,
    pending: Option<Row>,
}

impl<I, P> RecordGrouper<I, P>
where
    I: Iterator<Item = Result<Row>>,
    P: Fn(&Row, &Row) -> bool,
{
    pub fn new(rows: I, same_product: P) -> Self {
        Self {
            rows,
            same_product,
            pending: None,
        }
    }
}

impl<I, P> Iterator for RecordGrouper<I, P>
where
    I: Iterator<Item = Result<Row>>,
    P: Fn(&Row, &Row) -> bool,
{
    type Item = Result<ProductGroup>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = match self.pending.take() {
            Some(row) => row,
            None => match self.rows.next()? {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            },
        };

        let mut group = ProductGroup::new(first);
        for next in self.rows.by_ref() {
            let row = match next {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            if (self.same_product)(group.first(), &row) {
                group.push(row);
            } else {
                self.pending = Some(row);
                break;
            }
        }

        Some(Ok(group))
    }
}

impl<I, P> ChunkReader for RecordGrouper<I, P>
where
    I: Iterator<Item = Result<Row>> + Send,
    P: Fn(&Row, &Row) -> bool + Send,
{
    fn read_chunk(&mut self, limit: usize) -> Result<Vec<ProductGroup>> {
        self.by_ref().take(limit).collect()
    }
}
