//! A layer forwarding to any number of layers of the same type, so the set of
//! log outputs can come from config.

use tracing_core::{
    span,
    subscriber::{Interest, Subscriber},
    Event, Metadata,
};
use tracing_subscriber::layer::{Context, Layer};

pub struct Fanout<L>(pub Vec<L>);

impl<S, L> Layer<S> for Fanout<L>
where
    S: Subscriber,
    L: Layer<S>,
{
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        let mut interests = self.0.iter().map(|l| l.register_callsite(metadata));
        let first = match interests.next() {
            Some(i) => i,
            None => return Interest::never(),
        };
        interests.fold(first, |acc, i| {
            if (acc.is_always() && i.is_always()) || (acc.is_never() && i.is_never()) {
                acc
            } else {
                Interest::sometimes()
            }
        })
    }

    fn enabled(&self, metadata: &Metadata<'_>, ctx: Context<'_, S>) -> bool {
        self.0.iter().any(|l| l.enabled(metadata, ctx.clone()))
    }

    fn new_span(&self, attrs: &span::Attributes<'_>, id: &span::Id, ctx: Context<'_, S>) {
        self.0.iter().for_each(|l| l.new_span(attrs, id, ctx.clone()));
    }

    fn on_record(&self, span: &span::Id, values: &span::Record<'_>, ctx: Context<'_, S>) {
        self.0.iter().for_each(|l| l.on_record(span, values, ctx.clone()));
    }

    fn on_follows_from(&self, span: &span::Id, follows: &span::Id, ctx: Context<'_, S>) {
        self.0.iter().for_each(|l| l.on_follows_from(span, follows, ctx.clone()));
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        self.0.iter().for_each(|l| l.on_event(event, ctx.clone()));
    }

    fn on_enter(&self, id: &span::Id, ctx: Context<'_, S>) {
        self.0.iter().for_each(|l| l.on_enter(id, ctx.clone()));
    }

    fn on_exit(&self, id: &span::Id, ctx: Context<'_, S>) {
        self.0.iter().for_each(|l| l.on_exit(id, ctx.clone()));
    }

    fn on_close(&self, id: span::Id, ctx: Context<'_, S>) {
        self.0.iter().for_each(|l| l.on_close(id.clone(), ctx.clone()));
    }

    fn on_id_change(&self, old: &span::Id, new: &span::Id, ctx: Context<'_, S>) {
        self.0.iter().for_each(|l| l.on_id_change(old, new, ctx.clone()));
    }
}
