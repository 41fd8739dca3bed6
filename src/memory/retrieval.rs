//! 证据检索：TF-IDF 向量化 + 余弦相似度排序
//!
//! 纯函数：每次在上下文日志快照上重新拟合词表与 IDF，不维护增量索引，
//! 同一快照与同一查询必然得到相同的排序结果。

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::memory::tokenizer;
use crate::memory::ContextEntry;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("evidence corpus is empty")]
    EmptyCorpus,

    #[error("evidence corpus has no indexable terms")]
    EmptyVocabulary,
}

/// 在语料上拟合得到的词表与平滑 IDF：idf = ln((1 + n) / (1 + df)) + 1
#[derive(Debug, Clone)]
pub struct TfIdfModel {
    /// term -> 维度下标（按字典序分配，保证确定性）
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f32>,
}

impl TfIdfModel {
    pub fn fit(documents: &[Vec<String>]) -> Result<Self, RetrievalError> {
        if documents.is_empty() {
            return Err(RetrievalError::EmptyCorpus);
        }

        let mut document_frequency: BTreeMap<&str, usize> = BTreeMap::new();
        for doc in documents {
            let unique: BTreeSet<&str> = doc.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }
        if document_frequency.is_empty() {
            return Err(RetrievalError::EmptyVocabulary);
        }

        let n = documents.len() as f32;
        let mut vocabulary = BTreeMap::new();
        let mut idf = Vec::with_capacity(document_frequency.len());
        for (i, (term, df)) in document_frequency.into_iter().enumerate() {
            vocabulary.insert(term.to_string(), i);
            idf.push(((1.0 + n) / (1.0 + df as f32)).ln() + 1.0);
        }

        Ok(Self { vocabulary, idf })
    }

    pub fn vocabulary_len(&self) -> usize {
        self.idf.len()
    }

    /// 将词序列转为 L2 归一化的 TF-IDF 稠密向量；词表外的词被忽略
    pub fn transform(&self, tokens: &[String]) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.idf.len()];
        for token in tokens {
            if let Some(&i) = self.vocabulary.get(token) {
                vector[i] += 1.0;
            }
        }
        for (value, idf) in vector.iter_mut().zip(&self.idf) {
            *value *= idf;
        }
        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in vector.iter_mut() {
                *value /= norm;
            }
        }
        vector
    }
}

/// 余弦相似度
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// 一条证据：日志下标、相似度与记录副本
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub index: usize,
    pub score: f32,
    pub entry: ContextEntry,
}

/// 对语料中每条记录（任务描述 + 原始回复）按与 query 的相似度降序排序，取前 top_k 条正分结果。
/// 同分时较新的记录在前。
pub fn rank_evidence(
    query: &str,
    corpus: &[ContextEntry],
    top_k: usize,
) -> Result<Vec<Evidence>, RetrievalError> {
    if corpus.is_empty() {
        return Err(RetrievalError::EmptyCorpus);
    }

    let documents: Vec<Vec<String>> = corpus
        .iter()
        .map(|entry| tokenizer::tokenize(&entry.search_text()))
        .collect();
    let model = TfIdfModel::fit(&documents)?;
    let query_vector = model.transform(&tokenizer::tokenize(query));

    let mut scored: Vec<(usize, f32)> = documents
        .iter()
        .enumerate()
        .map(|(i, doc)| (i, cosine_similarity(&query_vector, &model.transform(doc))))
        .filter(|(_, score)| *score > 0.0)
        .collect();

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.0.cmp(&a.0))
    });

    Ok(scored
        .into_iter()
        .take(top_k)
        .map(|(index, score)| Evidence {
            index,
            score,
            entry: corpus[index].clone(),
        })
        .collect())
}
