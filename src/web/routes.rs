
use std::sync::Arc;
use warp::{filters::BoxedFilter, http::Uri, Filter, Reply};

use super::handlers;
use super::State;
use crate::team::{UploadableMember, UploadableTeam};

pub fn router(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    index()
        .or(player_summary(Arc::clone(&state)))
        .or(player_live(Arc::clone(&state)))
        .or(teams_list(Arc::clone(&state)))
        .or(teams_create(Arc::clone(&state)))
        .or(team_get(Arc::clone(&state)))
        .or(team_add_member(Arc::clone(&state)))
        .or(team_remove_member(Arc::clone(&state)))
        .or(diagnostics(Arc::clone(&state)))
        .boxed()
}

fn index() -> BoxedFilter<(impl Reply,)> {
    let route = warp::path::end().map(|| warp::redirect(Uri::from_static("/api/teams")));
    warp::get().and(route).boxed()
}

fn player_summary(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("api")
        .and(warp::path("players"))
        .and(warp::path::param::<String>())
        .and(warp::path::param::<String>())
        .and(warp::path("summary"))
        .and(warp::path::end())
        .and(warp::query::<handlers::SummaryQuery>())
        .and_then(move |name: String, tag: String, query: handlers::SummaryQuery| {
            handlers::player_summary_handler(Arc::clone(&state), name, tag, query)
        });

    warp::get().and(route).boxed()
}

fn player_live(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("api")
        .and(warp::path("players"))
        .and(warp::path::param::<String>())
        .and(warp::path::param::<String>())
        .and(warp::path("live"))
        .and(warp::path::end())
        .and_then(move |name: String, tag: String| {
            handlers::player_live_handler(Arc::clone(&state), name, tag)
        });

    warp::get().and(route).boxed()
}

fn teams_list(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("api")
        .and(warp::path("teams"))
        .and(warp::path::end())
        .and_then(move || handlers::teams_list_handler(Arc::clone(&state)));

    warp::get().and(route).boxed()
}

fn teams_create(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("api")
        .and(warp::path("teams"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and_then(move |team: UploadableTeam| {
            handlers::teams_create_handler(Arc::clone(&state), team)
        });

    warp::post().and(route).boxed()
}

fn team_get(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("api")
        .and(warp::path("teams"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and_then(move |slug: String| handlers::team_get_handler(Arc::clone(&state), slug));

    warp::get().and(route).boxed()
}

fn team_add_member(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("api")
        .and(warp::path("teams"))
        .and(warp::path::param::<String>())
        .and(warp::path("members"))
        .and(warp::path::end())
        .and(warp::body::json())
        .and_then(move |slug: String, member: UploadableMember| {
            handlers::team_add_member_handler(Arc::clone(&state), slug, member)
        });

    warp::post().and(route).boxed()
}

fn team_remove_member(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("api")
        .and(warp::path("teams"))
        .and(warp::path::param::<String>())
        .and(warp::path("members"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and_then(move |slug: String, puuid: String| {
            handlers::team_remove_member_handler(Arc::clone(&state), slug, puuid)
        });

    warp::delete().and(route).boxed()
}

fn diagnostics(state: Arc<State>) -> BoxedFilter<(impl Reply,)> {
    let route = warp::path("api")
        .and(warp::path("diagnostics"))
        .and(warp::path::end())
        .and_then(move || handlers::diagnostics_handler(Arc::clone(&state)));

    warp::get().and(route).boxed()
}
