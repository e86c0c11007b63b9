use axum::{
    handler::Handler,
    routing::{get, post},
    Router,
};

pub fn main_router<STATE>(components: Vec<(String, Router<STATE>)>, state: STATE) -> Router
where
    STATE: Clone + Send + Sync + 'static
{
    let mut app = Router::<STATE>::new();

    for (path, router) in components {
        tracing::debug!(%path, "route registered");
        app = app.merge(router);
    }

    app.with_state(state)
}



pub fn get_router_builder<T, S>(
    path: String,
    handler: impl Handler<T, S> + Clone + Send + 'static
) -> (String, Router<S>)
where
    T: 'static,
    S: Clone + Send + Sync + 'static,
{
    let app = Router::<S>::new().route(&path, get(handler));
    (path, app)
}


pub fn post_router_builder<T, S>(
    path: String,
    handler: impl Handler<T, S> + Clone + Send + 'static
) -> (String, Router<S>)
where
    T: 'static,
    S: Clone + Send + Sync + 'static,
{
    let app = Router::<S>::new().route(&path, post(handler));
    (path, app)
}

/// A page that shows a form on GET and handles its submission on POST.
pub fn form_router_builder<G, P, S>(
    path: String,
    show: impl Handler<G, S> + Clone + Send + 'static,
    submit: impl Handler<P, S> + Clone + Send + 'static,
) -> (String, Router<S>)
where
    G: 'static,
    P: 'static,
    S: Clone + Send + Sync + 'static,
{
    let app = Router::<S>::new().route(&path, get(show).post(submit));
    (path, app)
}
