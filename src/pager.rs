use std::time::Instant;

use crate::api::{MgRastClient, PageRequest};
use crate::domain::MetagenomeId;
use crate::error::SurveyError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub total_count: u64,
    pub ids: Vec<MetagenomeId>,
}

/// Lazy walk over the listing endpoint. Yields one page per request and
/// finishes once `offset + page_size` reaches the `total_count` of the
/// latest response, or after the first error.
pub struct Pages<'a, C: MgRastClient + ?Sized> {
    client: &'a C,
    page_size: u64,
    offset: u64,
    finished: bool,
}

impl<'a, C: MgRastClient + ?Sized> Pages<'a, C> {
    pub fn new(client: &'a C, page_size: u64) -> Result<Self, SurveyError> {
        if page_size == 0 {
            return Err(SurveyError::InvalidPageSize);
        }
        Ok(Self {
            client,
            page_size,
            offset: 0,
            finished: false,
        })
    }

    fn fetch(&self) -> Result<Page, SurveyError> {
        let request = PageRequest::all(self.offset, self.page_size);
        tracing::info!(
            "requesting items {}-{}",
            self.offset.saturating_add(1),
            self.offset.saturating_add(self.page_size)
        );
        let start = Instant::now();
        let listing = self.client.fetch_page(&request)?;
        let ids = listing
            .data
            .iter()
            .map(|record| MetagenomeId::from_api(&record.id))
            .collect::<Result<Vec<_>, SurveyError>>()?;
        tracing::info!(
            offset = self.offset,
            received = ids.len(),
            total = listing.total_count,
            latency_ms = start.elapsed().as_millis() as u64,
            "page fetched"
        );
        Ok(Page {
            offset: self.offset,
            total_count: listing.total_count,
            ids,
        })
    }
}

impl<C: MgRastClient + ?Sized> Iterator for Pages<'_, C> {
    type Item = Result<Page, SurveyError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.fetch() {
            Ok(page) => {
                let next = self.offset.saturating_add(self.page_size);
                if next >= page.total_count {
                    self.finished = true;
                } else {
                    self.offset = next;
                }
                Some(Ok(page))
            }
            Err(err) => {
                self.finished = true;
                Some(Err(err))
            }
        }
    }
}

pub fn fetch_all_identifiers<C: MgRastClient + ?Sized>(
    client: &C,
    page_size: u64,
) -> Result<Vec<MetagenomeId>, SurveyError> {
    let mut ids = Vec::new();
    for page in Pages::new(client, page_size)? {
        ids.extend(page?.ids);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use assert_matches::assert_matches;

    use super::*;
    use crate::api::{BriefRecord, ListingResponse, Verbosity};

    // reports totals[n] on the n-th request, the last entry thereafter
    struct CountingClient {
        totals: Vec<u64>,
        requests: Mutex<Vec<u64>>,
    }

    impl CountingClient {
        fn new(total: u64) -> Self {
            Self::with_totals(vec![total])
        }

        fn with_totals(totals: Vec<u64>) -> Self {
            Self {
                totals,
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl MgRastClient for CountingClient {
        fn fetch_page(&self, request: &PageRequest) -> Result<ListingResponse, SurveyError> {
            let mut requests = self.requests.lock().unwrap();
            let total = self.totals[requests.len().min(self.totals.len() - 1)];
            requests.push(request.offset);
            let end = request.offset.saturating_add(request.limit).min(total);
            let data = (request.offset..end)
                .map(|n| BriefRecord {
                    id: format!("mgm{}.3", 4440000 + n),
                })
                .collect();
            Ok(ListingResponse {
                total_count: total,
                data,
            })
        }

        fn fetch_metagenome(
            &self,
            _id: &MetagenomeId,
            _verbosity: Verbosity,
        ) -> Result<Vec<u8>, SurveyError> {
            Err(SurveyError::ApiHttp("not used".to_string()))
        }

        fn download(
            &self,
            _id: &MetagenomeId,
            _file: &str,
            _destination: &Path,
        ) -> Result<u64, SurveyError> {
            Err(SurveyError::ApiHttp("not used".to_string()))
        }
    }

    #[test]
    fn three_requests_for_25_items_of_10() {
        let client = CountingClient::new(25);
        let ids = fetch_all_identifiers(&client, 10).unwrap();
        assert_eq!(*client.requests.lock().unwrap(), vec![0, 10, 20]);
        assert_eq!(ids.len(), 25);
        assert_eq!(ids[0].as_str(), "4440000.3");
    }

    #[test]
    fn exact_multiple_stops_on_last_full_page() {
        let client = CountingClient::new(30);
        fetch_all_identifiers(&client, 10).unwrap();
        assert_eq!(client.requests.lock().unwrap().len(), 3);
    }

    #[test]
    fn empty_listing_is_one_request() {
        let client = CountingClient::new(0);
        let ids = fetch_all_identifiers(&client, 10).unwrap();
        assert!(ids.is_empty());
        assert_eq!(client.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn shrinking_total_stops_early() {
        let client = CountingClient::with_totals(vec![25, 15]);
        let ids = fetch_all_identifiers(&client, 10).unwrap();
        assert_eq!(*client.requests.lock().unwrap(), vec![0, 10]);
        assert_eq!(ids.len(), 15);
    }

    #[test]
    fn growing_total_extends_the_walk() {
        let client = CountingClient::with_totals(vec![25, 35]);
        let ids = fetch_all_identifiers(&client, 10).unwrap();
        assert_eq!(*client.requests.lock().unwrap(), vec![0, 10, 20, 30]);
        assert_eq!(ids.len(), 35);
    }

    #[test]
    fn huge_page_size_does_not_overflow() {
        let client = CountingClient::new(25);
        let ids = fetch_all_identifiers(&client, u64::MAX).unwrap();
        assert_eq!(*client.requests.lock().unwrap(), vec![0]);
        assert_eq!(ids.len(), 25);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let client = CountingClient::new(5);
        let err = fetch_all_identifiers(&client, 0).unwrap_err();
        assert_matches!(err, SurveyError::InvalidPageSize);
        assert!(client.requests.lock().unwrap().is_empty());
    }
}
