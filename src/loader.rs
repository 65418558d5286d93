use crate::api::{ApiError, HandbookApi, SectionPayload};
use crate::chapter::SectionPage;
use crate::menu::MenuNode;
use log::{debug, error};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::time::Duration;
use tokio::runtime::Runtime;

/// Identity of one outstanding request. Results carry the ticket they were
/// issued for so that a stale result can be recognized and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Menu,
    SectionPages { section_id: i64 },
    Create(SectionPayload),
    Update { section_id: i64, payload: SectionPayload },
    Delete { section_id: i64 },
}

#[derive(Debug)]
pub enum Response {
    Menu(Vec<MenuNode>),
    SectionPages { section_id: i64, pages: Vec<SectionPage> },
    Mutated,
}

impl Response {
    pub fn into_menu(self) -> Vec<MenuNode> {
        match self {
            Response::Menu(menu) => menu,
            _ => Vec::new(),
        }
    }

    pub fn into_pages(self) -> Vec<SectionPage> {
        match self {
            Response::SectionPages { pages, .. } => pages,
            _ => Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Completed {
    pub ticket: Ticket,
    pub request: Request,
    pub result: Result<Response, ApiError>,
}

/// Anything that can start a request and hand back its ticket.
pub trait RequestSink {
    fn submit(&mut self, request: Request) -> Ticket;
}

/// Runs API calls off the UI thread and hands results back over a channel.
pub struct ContentLoader<A: HandbookApi> {
    api: Arc<A>,
    runtime: Runtime,
    sender: Sender<Completed>,
    receiver: Receiver<Completed>,
    next_ticket: u64,
    in_flight: usize,
}

impl<A: HandbookApi> ContentLoader<A> {
    pub fn new(api: A) -> Result<Self, ApiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("handbook-loader")
            .enable_all()
            .build()
            .map_err(|e| ApiError::Runtime(e.to_string()))?;
        let (sender, receiver) = channel();
        Ok(Self {
            api: Arc::new(api),
            runtime,
            sender,
            receiver,
            next_ticket: 0,
            in_flight: 0,
        })
    }

    pub fn api(&self) -> &Arc<A> {
        &self.api
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Start `request` in the background and return its ticket.
    pub fn submit(&mut self, request: Request) -> Ticket {
        self.next_ticket += 1;
        let ticket = Ticket(self.next_ticket);
        self.in_flight += 1;
        debug!("Submitting {request:?} as ticket {}", ticket.0);

        let api = self.api.clone();
        let sender = self.sender.clone();
        self.runtime.spawn(async move {
            let result = execute(api.as_ref(), &request).await;
            if let Err(e) = &result {
                error!("Request {request:?} failed: {e}");
            }
            // The receiver only goes away when the app shuts down.
            let _ = sender.send(Completed {
                ticket,
                request,
                result,
            });
        });
        ticket
    }

    /// Results that finished since the last call, in completion order.
    pub fn poll(&mut self) -> Vec<Completed> {
        let completed: Vec<Completed> = self.receiver.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(completed.len());
        completed
    }

    /// Block up to `timeout` for the next result.
    pub fn wait(&mut self, timeout: Duration) -> Option<Completed> {
        let completed = self.receiver.recv_timeout(timeout).ok()?;
        self.in_flight = self.in_flight.saturating_sub(1);
        Some(completed)
    }
}

impl<A: HandbookApi> RequestSink for ContentLoader<A> {
    fn submit(&mut self, request: Request) -> Ticket {
        ContentLoader::submit(self, request)
    }
}

async fn execute<A: HandbookApi>(api: &A, request: &Request) -> Result<Response, ApiError> {
    match request {
        Request::Menu => api.fetch_menu().await.map(Response::Menu),
        Request::SectionPages { section_id } => api
            .fetch_section_pages(*section_id)
            .await
            .map(|pages| Response::SectionPages {
                section_id: *section_id,
                pages,
            }),
        Request::Create(payload) => api.create_section(payload).await.map(|_| Response::Mutated),
        Request::Update {
            section_id,
            payload,
        } => api
            .update_section(*section_id, payload)
            .await
            .map(|_| Response::Mutated),
        Request::Delete { section_id } => api
            .delete_section(*section_id)
            .await
            .map(|_| Response::Mutated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fake_api::FakeApi;

    #[test]
    fn test_results_are_tagged_with_tickets() {
        let api = FakeApi::with_sample_handbook();
        let mut loader = ContentLoader::new(api).unwrap();
        let menu = loader.submit(Request::Menu);
        let pages = loader.submit(Request::SectionPages { section_id: 11 });
        assert_ne!(menu, pages);
        assert_eq!(loader.in_flight(), 2);

        let mut seen = Vec::new();
        while seen.len() < 2 {
            let done = loader.wait(Duration::from_secs(5)).expect("request finished");
            seen.push((done.ticket, done.result.is_ok()));
        }
        seen.sort();
        assert_eq!(seen, vec![(menu, true), (pages, true)]);
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn test_failures_are_delivered() {
        let api = FakeApi::with_sample_handbook();
        api.fail_section(11);
        let mut loader = ContentLoader::new(api).unwrap();
        let ticket = loader.submit(Request::SectionPages { section_id: 11 });
        let done = loader.wait(Duration::from_secs(5)).unwrap();
        assert_eq!(done.ticket, ticket);
        assert!(matches!(done.result, Err(ApiError::Http { status: 500, .. })));
    }
}
